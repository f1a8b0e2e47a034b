//! Error types for the bridge core.
//!
//! Nothing here is fatal to the process. Errors surface where a caller can
//! act on them (the send path, registration); everything else, routing
//! misses and undecodable payloads and best-effort deletes included, is
//! logged and dropped, because the worst acceptable outcome anywhere is a
//! dropped or delayed message.

use crate::codec::CodecError;
use crate::path::{PathError, StorePath};
use crate::store::StoreError;

/// Errors surfaced by the bridge core.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The transport session could not be established.
    #[error("connect failed: {source}")]
    Connect {
        /// Status reported by the transport.
        source: StoreError,
    },

    /// A store operation failed at a specific path.
    #[error("store operation failed at {path}: {source}")]
    Store {
        /// Path the failed operation addressed.
        path: StorePath,
        /// Status reported by the transport.
        source: StoreError,
    },

    /// A message could not be encoded for transport.
    #[error(transparent)]
    Encode(CodecError),

    /// A message type name could not be turned into a store path.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Operation attempted in a state that does not allow it.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Details about the rejected operation.
        message: String,
    },
}
