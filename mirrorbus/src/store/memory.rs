//! In-process replicated store for tests, demos and single-device runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ReplicatedStore, StoreError, StoreEvent, StoreEvents};
use crate::path::StorePath;

/// Shared-state in-memory implementation of [`ReplicatedStore`].
///
/// Clones share one underlying store, so a gateway and a proxy holding
/// clones of the same `MemoryStore` see the fully replicated view, which
/// is what the real transport converges to, minus the latency.
///
/// Change detection is content-based: a write whose payload equals the
/// *last write* at that path emits no [`StoreEvent::Changed`], even if the
/// item was deleted in between. This mirrors transports that hash content
/// rather than diff against the live item, and it is the behavior the
/// sender's forcing field exists to defeat.
///
/// Fault-injection and lifecycle hooks (`fail_next_*`, [`suspend`],
/// [`fail_connection`], [`emit_peer_connected`]) let tests drive failure
/// paths deterministically.
///
/// [`suspend`]: MemoryStore::suspend
/// [`fail_connection`]: MemoryStore::fail_connection
/// [`emit_peer_connected`]: MemoryStore::emit_peer_connected
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryStoreState>>,
}

#[derive(Default)]
struct MemoryStoreState {
    entries: BTreeMap<StorePath, Vec<u8>>,
    last_written: BTreeMap<StorePath, Vec<u8>>,
    connected: bool,
    subscribers: Vec<mpsc::UnboundedSender<StoreEvent>>,
    fail_next_write: bool,
    fail_next_read: bool,
    fail_next_delete: bool,
}

impl MemoryStore {
    /// Create an empty, disconnected store.
    pub fn new() -> Self {
        Self::default()
    }

    fn broadcast(&self, event: StoreEvent) {
        self.inner
            .borrow_mut()
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Make the next write fail with a backend error.
    pub fn fail_next_write(&self) {
        self.inner.borrow_mut().fail_next_write = true;
    }

    /// Make the next read fail with a backend error.
    pub fn fail_next_read(&self) {
        self.inner.borrow_mut().fail_next_read = true;
    }

    /// Make the next delete fail with a backend error.
    pub fn fail_next_delete(&self) {
        self.inner.borrow_mut().fail_next_delete = true;
    }

    /// Announce a suspended session to all subscribers.
    pub fn suspend(&self, cause: &str) {
        self.broadcast(StoreEvent::ConnectionSuspended {
            cause: cause.to_string(),
        });
    }

    /// Announce a failed session to all subscribers.
    pub fn fail_connection(&self, reason: &str) {
        self.broadcast(StoreEvent::ConnectionFailed {
            reason: reason.to_string(),
        });
    }

    /// Announce a peer device joining the replication group.
    pub fn emit_peer_connected(&self, node: &str) {
        self.broadcast(StoreEvent::PeerConnected {
            node: node.to_string(),
        });
    }

    /// Announce a peer device leaving the replication group.
    pub fn emit_peer_disconnected(&self, node: &str) {
        self.broadcast(StoreEvent::PeerDisconnected {
            node: node.to_string(),
        });
    }

    /// Current payload at `path`, bypassing the async contract. Test hook.
    pub fn peek(&self, path: &StorePath) -> Option<Vec<u8>> {
        self.inner.borrow().entries.get(path).cloned()
    }

    /// Whether an item exists at `path`.
    pub fn contains(&self, path: &StorePath) -> bool {
        self.inner.borrow().entries.contains_key(path)
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}

#[async_trait(?Send)]
impl ReplicatedStore for MemoryStore {
    async fn connect(&self) -> Result<(), StoreError> {
        self.inner.borrow_mut().connected = true;
        // Announced on every connect, including redundant ones; receivers
        // gate their own once-only work.
        self.broadcast(StoreEvent::Connected);
        Ok(())
    }

    fn disconnect(&self) {
        let was_connected = {
            let mut state = self.inner.borrow_mut();
            let was = state.connected;
            state.connected = false;
            was
        };
        if was_connected {
            self.broadcast(StoreEvent::Disconnected);
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.borrow().connected
    }

    async fn write(&self, path: &StorePath, payload: Vec<u8>) -> Result<(), StoreError> {
        let notify = {
            let mut state = self.inner.borrow_mut();
            if !state.connected {
                return Err(StoreError::NotConnected);
            }
            if state.fail_next_write {
                state.fail_next_write = false;
                return Err(StoreError::Backend {
                    message: "injected write failure".to_string(),
                });
            }
            let unchanged = state
                .last_written
                .get(path)
                .is_some_and(|previous| previous == &payload);
            state.entries.insert(path.clone(), payload.clone());
            if unchanged {
                None
            } else {
                state.last_written.insert(path.clone(), payload.clone());
                Some(payload)
            }
        };
        if let Some(payload) = notify {
            self.broadcast(StoreEvent::Changed {
                path: path.clone(),
                payload,
            });
        }
        Ok(())
    }

    async fn read(&self, path: &StorePath) -> Result<Option<Vec<u8>>, StoreError> {
        let mut state = self.inner.borrow_mut();
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(StoreError::Backend {
                message: "injected read failure".to_string(),
            });
        }
        Ok(state.entries.get(path).cloned())
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        let removed = {
            let mut state = self.inner.borrow_mut();
            if !state.connected {
                return Err(StoreError::NotConnected);
            }
            if state.fail_next_delete {
                state.fail_next_delete = false;
                return Err(StoreError::Backend {
                    message: "injected delete failure".to_string(),
                });
            }
            state.entries.remove(path).is_some()
        };
        if removed {
            self.broadcast(StoreEvent::Deleted { path: path.clone() });
        }
        Ok(())
    }

    fn events(&self) -> StoreEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.borrow_mut().subscribers.push(tx);
        rx
    }
}
