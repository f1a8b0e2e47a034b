//! Local bus seam and type-erased bridged events.
//!
//! The bridge republishes decoded messages onto whatever publish/subscribe
//! bus the host application runs locally. The [`LocalBus`] trait is that
//! seam; [`BusEvent`] carries a decoded message with its concrete type
//! erased so one router can serve any number of registered types.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A typed message that can cross the bridge.
///
/// [`TYPE_NAME`](Self::TYPE_NAME) is the addressing contract: both peers
/// must register the exact same name for a type, because the store path is
/// derived from it. Use a stable, namespace-qualified name with `::`
/// separators (`"telemetry::BatteryStatus"`). Never use
/// [`std::any::type_name`]; its format is explicitly unstable across
/// compiler versions.
pub trait BusMessage: Serialize + DeserializeOwned + 'static {
    /// Stable fully-qualified name of this message type.
    const TYPE_NAME: &'static str;
}

/// A decoded message on its way onto the local bus.
#[derive(Clone)]
pub struct BusEvent {
    type_name: &'static str,
    payload: Rc<dyn Any>,
}

impl BusEvent {
    /// Wrap a decoded message.
    pub fn new<T: BusMessage>(message: T) -> Self {
        Self {
            type_name: T::TYPE_NAME,
            payload: Rc::new(message),
        }
    }

    /// The registered name of the carried message type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the carried message if it is a `T`.
    pub fn downcast<T: BusMessage>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for BusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusEvent")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// The local publish/subscribe bus the receiver republishes onto.
///
/// Both operations are fire-and-forget: the bus reports nothing back about
/// subscriber counts or delivery, and the bridge never asks.
pub trait LocalBus: Clone + 'static {
    /// Publish an event to current subscribers.
    fn publish(&self, event: BusEvent);

    /// Publish an event and retain it for subscribers that attach later.
    fn publish_sticky(&self, event: BusEvent);
}
