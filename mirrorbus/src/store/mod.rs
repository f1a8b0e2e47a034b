//! Replicated key-value transport seam.
//!
//! The bridge never talks to the network itself: it issues writes, reads
//! and deletes against a [`ReplicatedStore`] and consumes one typed event
//! stream carrying both data changes and connection lifecycle. Connection
//! bootstrapping, peer discovery, retries and timeouts all belong to the
//! transport behind this trait.

/// In-process store implementation for tests and single-device runs.
pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::path::StorePath;

/// Events delivered on a store subscription.
///
/// One stream carries connection lifecycle and data changes so a single
/// receiver task can handle everything in arrival order. Stores must
/// deliver events for the *same* path in the order the changes happened;
/// no ordering is promised across different paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The transport session is up.
    Connected,

    /// The transport session ended.
    Disconnected,

    /// The transport paused the session.
    ConnectionSuspended {
        /// Transport-reported cause.
        cause: String,
    },

    /// The transport gave up on establishing or keeping the session.
    ConnectionFailed {
        /// Transport-reported reason.
        reason: String,
    },

    /// An item was created or overwritten.
    Changed {
        /// Path of the changed item.
        path: StorePath,
        /// The item's payload after the change.
        payload: Vec<u8>,
    },

    /// An item was removed.
    Deleted {
        /// Path of the removed item.
        path: StorePath,
    },

    /// A peer device joined the replication group.
    PeerConnected {
        /// Transport-level node name.
        node: String,
    },

    /// A peer device left the replication group.
    PeerDisconnected {
        /// Transport-level node name.
        node: String,
    },
}

/// Errors reported by store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The operation needs a connected session.
    #[error("store is not connected")]
    NotConnected,

    /// The transport backend rejected or failed the operation.
    #[error("store backend error: {message}")]
    Backend {
        /// Status reported by the backend.
        message: String,
    },
}

/// Subscription handle for store events.
pub type StoreEvents = mpsc::UnboundedReceiver<StoreEvent>;

/// Contract consumed from the replicated key-value transport.
///
/// All operations resolve asynchronously and never block the caller.
/// Results for different paths may complete in any order; per-path order
/// follows the transport's delivery order. Implementations are `Clone`
/// handles onto one shared session, in the provider style used throughout
/// this crate.
///
/// Whether a write generates change notifications on the peer is the
/// transport's call: content-hashing transports suppress writes whose
/// payload is unchanged, which is exactly what the sender's forcing field
/// exists to defeat.
#[async_trait(?Send)]
pub trait ReplicatedStore: Clone + 'static {
    /// Open the transport session. Completion is also announced as
    /// [`StoreEvent::Connected`] on every subscription.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the session could not be established.
    async fn connect(&self) -> Result<(), StoreError>;

    /// Close the transport session. In-flight operations may still resolve
    /// afterwards; callers must tolerate their results as no-ops.
    fn disconnect(&self);

    /// Whether a session is currently established.
    fn is_connected(&self) -> bool;

    /// Write `payload` at `path`, replacing any existing item.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] with the transport's reported status. The
    /// bridge never retries; retry policy belongs to the transport or the
    /// caller.
    async fn write(&self, path: &StorePath, payload: Vec<u8>) -> Result<(), StoreError>;

    /// Read the payload at `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the read could not be performed; an
    /// absent item is `Ok(None)`, not an error.
    async fn read(&self, path: &StorePath) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete the item at `path`. Deleting an absent item is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] with the transport's reported status.
    async fn delete(&self, path: &StorePath) -> Result<(), StoreError>;

    /// Subscribe to the event stream. Each call returns an independent
    /// subscription that observes every event from this point on.
    fn events(&self) -> StoreEvents;
}
