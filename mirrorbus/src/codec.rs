//! Message serialization for the bridge.
//!
//! Bridged messages travel as text inside an [`Envelope`](crate::Envelope),
//! so the codec contract is text in, text out: [`MessageCodec::encode`]
//! turns a typed message into the string stored under the envelope's
//! object key, and [`MessageCodec::decode`] turns that string back into
//! the registered type on the receiving side. Both peers must run the same
//! codec for a given deployment; the bridge itself only moves the text
//! around.
//!
//! [`JsonCodec`] is the default: human-readable, and the encoding the
//! envelope layer pins as canonical for change detection.
//!
//! # Example
//!
//! ```rust
//! use mirrorbus::{JsonCodec, MessageCodec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct BatteryStatus {
//!     level: u8,
//! }
//!
//! let codec = JsonCodec;
//! let status = BatteryStatus { level: 73 };
//!
//! let text = codec.encode(&status).unwrap();
//! assert_eq!(text, r#"{"level":73}"#);
//!
//! let decoded: BatteryStatus = codec.decode(&text).unwrap();
//! assert_eq!(status, decoded);
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from encoding or decoding bridged message text.
///
/// Carries the serializer's diagnostic as plain text rather than the error
/// value itself, so it clones cheaply into the logging and metrics paths
/// where the receiver drops undecodable payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A message could not be serialized to text.
    #[error("encode failed: {message}")]
    Encode {
        /// Serializer diagnostic.
        message: String,
    },

    /// Message text could not be deserialized into the expected type.
    #[error("decode failed: {message}")]
    Decode {
        /// Deserializer diagnostic.
        message: String,
    },
}

/// Serialization format for bridged messages.
///
/// Equal message values must encode to equal text; the transport's
/// content-based change suppression compares bytes, and an unstable
/// encoding would make `*_only_if_changed` sends fire spuriously. The
/// trait requires `Clone + 'static` so codec instances can be handed to
/// registered interests and kept for the process lifetime.
pub trait MessageCodec: Clone + 'static {
    /// Encode a message to the text stored inside an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, message: &T) -> Result<String, CodecError>;

    /// Decode envelope text into a message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the text does not parse as a `T`.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, CodecError>;
}

/// JSON codec backed by serde_json, the default.
///
/// Struct fields serialize in declaration order, so a given message value
/// always encodes to the same text.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode<T: Serialize>(&self, message: &T) -> Result<String, CodecError> {
        serde_json::to_string(message).map_err(|e| CodecError::Encode {
            message: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, CodecError> {
        serde_json::from_str(text).map_err(|e| CodecError::Decode {
            message: e.to_string(),
        })
    }
}
