//! Envelope layout for payloads written to the replicated store.
//!
//! An envelope is the JSON object stored at a path: the encoded message
//! text under a key equal to the path's object key, plus, for "always
//! send" deliveries only, a forcing timestamp under [`FORCING_FIELD`].
//! The timestamp is what makes an otherwise identical payload look new to a
//! transport that detects changes by hashing content.
//!
//! Byte encoding is canonical: `serde_json` keeps object keys sorted, so
//! the same logical envelope always serializes to the same bytes. Change
//! suppression that compares bytes therefore agrees with logical equality.

use serde_json::{Map, Value};

/// Key of the forcing field inside an envelope.
///
/// Present if-and-only-if the send was issued in "always send" mode. The
/// leading slash keeps the key outside the object-key space: object keys
/// are path segments joined by `/` and segments are never empty, so no
/// object key can begin with a slash. A message type named `time` therefore
/// cannot collide with the forcing field.
pub const FORCING_FIELD: &str = "/time";

/// Errors from parsing an envelope read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// The payload was not valid JSON.
    #[error("envelope is not valid JSON: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },

    /// The payload was valid JSON but not an object.
    #[error("envelope is not an object")]
    NotAnObject,

    /// The object held no entry under the expected key.
    #[error("envelope is missing object key {key:?}")]
    MissingObjectKey {
        /// The key that was expected.
        key: String,
    },

    /// The entry under the object key was not encoded message text.
    #[error("envelope entry {key:?} is not a string")]
    MalformedEntry {
        /// The key whose entry had the wrong shape.
        key: String,
    },
}

/// The payload written at a store path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    object_key: String,
    message: String,
    forced_at: Option<u64>,
}

impl Envelope {
    /// Envelope for a change-deduplicated send: message text only.
    pub fn new(object_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            message: message.into(),
            forced_at: None,
        }
    }

    /// Envelope for an "always send" delivery, stamped with a forcing
    /// timestamp that must differ from every prior send at the same path.
    pub fn forced(
        object_key: impl Into<String>,
        message: impl Into<String>,
        forced_at: u64,
    ) -> Self {
        Self {
            object_key: object_key.into(),
            message: message.into(),
            forced_at: Some(forced_at),
        }
    }

    /// The key the message text is stored under.
    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    /// The encoded message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The forcing timestamp, if this was an "always send" delivery.
    pub fn forced_at(&self) -> Option<u64> {
        self.forced_at
    }

    /// Canonical byte encoding of the envelope.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut map = Map::new();
        map.insert(
            self.object_key.clone(),
            Value::String(self.message.clone()),
        );
        if let Some(stamp) = self.forced_at {
            map.insert(FORCING_FIELD.to_string(), Value::Number(stamp.into()));
        }
        // A map of strings and numbers always serializes.
        serde_json::to_vec(&Value::Object(map)).unwrap_or_default()
    }

    /// Parse an envelope, expecting the message text under `object_key`.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvelopeError`] if the payload is not a JSON object, has
    /// no entry under `object_key`, or the entry is not a string.
    pub fn from_bytes(payload: &[u8], object_key: &str) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| EnvelopeError::Malformed {
                message: e.to_string(),
            })?;
        let Value::Object(map) = value else {
            return Err(EnvelopeError::NotAnObject);
        };
        let entry = map.get(object_key).ok_or_else(|| EnvelopeError::MissingObjectKey {
            key: object_key.to_string(),
        })?;
        let Value::String(message) = entry else {
            return Err(EnvelopeError::MalformedEntry {
                key: object_key.to_string(),
            });
        };
        let forced_at = map.get(FORCING_FIELD).and_then(Value::as_u64);
        Ok(Self {
            object_key: object_key.to_string(),
            message: message.clone(),
            forced_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_envelope_has_no_forcing_field() {
        let envelope = Envelope::new("net/Ping", r#"{"seq":1}"#);
        let bytes = envelope.to_bytes();
        assert_eq!(bytes, br#"{"net/Ping":"{\"seq\":1}"}"#);

        let parsed = Envelope::from_bytes(&bytes, "net/Ping").expect("parse should succeed");
        assert_eq!(parsed.forced_at(), None);
        assert_eq!(parsed.message(), r#"{"seq":1}"#);
    }

    #[test]
    fn test_forced_envelope_roundtrip() {
        let envelope = Envelope::forced("net/Ping", r#"{"seq":1}"#, 1700000000001);
        let parsed =
            Envelope::from_bytes(&envelope.to_bytes(), "net/Ping").expect("parse should succeed");
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.forced_at(), Some(1700000000001));
    }

    #[test]
    fn test_encoding_is_order_stable() {
        // Keys are sorted on serialization, so equal envelopes encode to
        // equal bytes no matter how they were built.
        let a = Envelope::forced("zz/Last", "{}", 5);
        let b = Envelope::forced("zz/Last", "{}", 5);
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.to_bytes(), br#"{"/time":5,"zz/Last":"{}"}"#.to_vec());
    }

    #[test]
    fn test_time_object_key_does_not_collide_with_forcing_field() {
        // A message type named `time` stores under the object key "time";
        // the forcing field must not displace it.
        let envelope = Envelope::forced("time", r#"{"tick":1}"#, 9);
        let parsed = Envelope::from_bytes(&envelope.to_bytes(), "time").expect("parse");
        assert_eq!(parsed.message(), r#"{"tick":1}"#);
        assert_eq!(parsed.forced_at(), Some(9));
    }

    #[test]
    fn test_missing_object_key_is_rejected() {
        let envelope = Envelope::new("net/Ping", "{}");
        let result = Envelope::from_bytes(&envelope.to_bytes(), "net/Pong");
        assert_eq!(
            result,
            Err(EnvelopeError::MissingObjectKey {
                key: "net/Pong".to_string()
            })
        );
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let result = Envelope::from_bytes(b"[1,2,3]", "net/Ping");
        assert_eq!(result, Err(EnvelopeError::NotAnObject));
    }

    #[test]
    fn test_non_string_entry_is_rejected() {
        let result = Envelope::from_bytes(br#"{"net/Ping":7}"#, "net/Ping");
        assert_eq!(
            result,
            Err(EnvelopeError::MalformedEntry {
                key: "net/Ping".to_string()
            })
        );
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        let result = Envelope::from_bytes(b"not json {", "net/Ping");
        assert!(matches!(result, Err(EnvelopeError::Malformed { .. })));
    }
}
