//! Shared test support: recording bus, manual clock, message types.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use mirrorbus::{BusEvent, BusMessage, LocalBus, WallClock};

/// Install a fmt subscriber once so `RUST_LOG` controls test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Local bus double that records every publish with its sticky flag.
#[derive(Clone, Default)]
pub struct RecordingBus {
    published: Rc<RefCell<Vec<(bool, BusEvent)>>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.published.borrow().len()
    }

    /// The most recent publish, downcast to `T`.
    pub fn last<T: BusMessage + Clone>(&self) -> Option<(bool, T)> {
        self.published
            .borrow()
            .last()
            .and_then(|(sticky, event)| event.downcast::<T>().cloned().map(|m| (*sticky, m)))
    }

    /// Every publish downcast to `T`, skipping other types.
    pub fn all<T: BusMessage + Clone>(&self) -> Vec<(bool, T)> {
        self.published
            .borrow()
            .iter()
            .filter_map(|(sticky, event)| event.downcast::<T>().cloned().map(|m| (*sticky, m)))
            .collect()
    }
}

impl LocalBus for RecordingBus {
    fn publish(&self, event: BusEvent) {
        self.published.borrow_mut().push((false, event));
    }

    fn publish_sticky(&self, event: BusEvent) {
        self.published.borrow_mut().push((true, event));
    }
}

/// Clock the test advances by hand.
#[derive(Clone)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn at(millis: u64) -> Self {
        Self(Rc::new(Cell::new(millis)))
    }

    #[allow(dead_code)]
    pub fn advance(&self, millis: u64) {
        self.0.set(self.0.get() + millis);
    }
}

impl WallClock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.get()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Ping {
    pub seq: u32,
}

impl BusMessage for Ping {
    const TYPE_NAME: &'static str = "Ping";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Position {
    pub lat: i64,
    pub lon: i64,
}

impl BusMessage for Position {
    const TYPE_NAME: &'static str = "telemetry::gps::Position";
}
