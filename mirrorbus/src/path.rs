//! Store path derivation and unique-instance addressing.
//!
//! Every bridged message type maps to one canonical path in the replicated
//! store: the components of its fully-qualified name joined by `/` with a
//! leading slash. Singleton sends reuse that path, overwriting the previous
//! value; unique-instance sends append a numeric trailing segment so each
//! send occupies its own slot.
//!
//! ```rust
//! use mirrorbus::StorePath;
//!
//! let path = StorePath::for_type_name("telemetry::gps::Position").unwrap();
//! assert_eq!(path.as_str(), "/telemetry/gps/Position");
//! assert_eq!(path.object_key(), "telemetry/gps/Position");
//!
//! let slot = path.with_instance(1704067200000);
//! assert_eq!(slot.as_str(), "/telemetry/gps/Position/1704067200000");
//! assert_eq!(slot.split_instance(), Some((path, 1704067200000)));
//! ```

use std::fmt;

/// Separator between the components of a fully-qualified type name.
const TYPE_SEPARATOR: &str = "::";

/// Errors from deriving or parsing store paths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The type name was empty, had an empty component, or a component
    /// containing the path separator.
    #[error("invalid type name: {name:?}")]
    InvalidTypeName {
        /// The offending type name.
        name: String,
    },

    /// A raw key did not have the shape of a store path.
    #[error("invalid store path: {path:?}")]
    InvalidPath {
        /// The offending raw key.
        path: String,
    },
}

/// Hierarchical key addressing one slot in the replicated store.
///
/// Always normalized: leading slash, non-empty `/`-separated segments.
/// Derivation from a type name is deterministic and injective: two
/// distinct valid type names can never collide on the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(String);

impl StorePath {
    /// Derive the canonical singleton path for a fully-qualified type name.
    ///
    /// Name components are separated by `::` and become path segments:
    /// `telemetry::BatteryStatus` derives `/telemetry/BatteryStatus`.
    /// Pure and deterministic, no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidTypeName`] for an empty name, an empty
    /// component (`"a::::b"`), or a component containing `/`.
    pub fn for_type_name(name: &str) -> Result<Self, PathError> {
        if name.is_empty() {
            return Err(PathError::InvalidTypeName {
                name: name.to_string(),
            });
        }
        let mut path = String::with_capacity(name.len() + 1);
        for component in name.split(TYPE_SEPARATOR) {
            if component.is_empty() || component.contains('/') {
                return Err(PathError::InvalidTypeName {
                    name: name.to_string(),
                });
            }
            path.push('/');
            path.push_str(component);
        }
        Ok(Self(path))
    }

    /// Parse a raw key as received from the transport.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPath`] unless the key starts with `/`
    /// and has no empty segments.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let invalid = || PathError::InvalidPath {
            path: raw.to_string(),
        };
        let rest = raw.strip_prefix('/').ok_or_else(invalid)?;
        if rest.is_empty() || rest.split('/').any(|segment| segment.is_empty()) {
            return Err(invalid());
        }
        Ok(Self(raw.to_string()))
    }

    /// Append an instance id, addressing a distinct slot for this send.
    ///
    /// Ids are expected to be strictly increasing within a process; an id
    /// collision across processes is a silent overwrite, not an error, since
    /// the store addresses purely by path equality.
    pub fn with_instance(&self, id: u64) -> Self {
        Self(format!("{}/{id}", self.0))
    }

    /// Split a trailing instance id off the path.
    ///
    /// Only an all-digit trailing segment counts as an instance id. A path
    /// with any other final segment, or with no segment left to serve as a
    /// base, returns `None`, so registered paths can never be shadowed by
    /// partial-prefix lookalikes.
    pub fn split_instance(&self) -> Option<(StorePath, u64)> {
        let (base, last) = self.0.rsplit_once('/')?;
        if base.is_empty() || last.is_empty() {
            return None;
        }
        if !last.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let id = last.parse().ok()?;
        Some((StorePath(base.to_string()), id))
    }

    /// The envelope key the encoded message is stored under: all segments
    /// joined by `/`, without the leading slash.
    pub fn object_key(&self) -> &str {
        &self.0[1..]
    }

    /// The local cache slot for this path: the path prefixed with
    /// `/<namespace>`.
    pub fn local_slot(&self, namespace: &str) -> StorePath {
        StorePath(format!("/{namespace}{}", self.0))
    }

    /// The path as a string, leading slash included.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
