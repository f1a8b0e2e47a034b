//! Registered interests and path lookup.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::bus::{BusEvent, BusMessage};
use crate::codec::{CodecError, MessageCodec};
use crate::path::{PathError, StorePath};

/// Delivery policy for one registered message type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Republish with sticky semantics, retained for late subscribers.
    pub sticky: bool,

    /// Mirror delivered envelopes into the local cache slot, to be replayed
    /// on the first connect after a process restart.
    pub cache_locally: bool,

    /// Delete the remote item once it has been republished.
    pub delete_on_read: bool,
}

impl DeliveryOptions {
    /// Plain delivery with every knob off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable sticky republish.
    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    /// Enable local-cache mirroring.
    pub fn cache_locally(mut self) -> Self {
        self.cache_locally = true;
        self
    }

    /// Enable delete-on-read.
    pub fn delete_on_read(mut self) -> Self {
        self.delete_on_read = true;
        self
    }
}

/// Decodes envelope message text into a type-erased bus event.
///
/// One implementation exists per registered message type; the registry
/// holds them behind `Rc` so lookups stay read-only and cheap.
pub(crate) trait EventDecoder {
    fn decode(&self, text: &str) -> Result<BusEvent, CodecError>;
}

struct TypedDecoder<T, C> {
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T: BusMessage, C: MessageCodec> EventDecoder for TypedDecoder<T, C> {
    fn decode(&self, text: &str) -> Result<BusEvent, CodecError> {
        let message: T = self.codec.decode(text)?;
        Ok(BusEvent::new(message))
    }
}

/// An immutable binding from a store path to a message type and its
/// delivery policy.
///
/// Created once at registration time, before the receiver connects, and
/// looked up read-only for every incoming change.
#[derive(Clone)]
pub struct Interest {
    path: StorePath,
    object_key: String,
    type_name: &'static str,
    options: DeliveryOptions,
    decoder: Rc<dyn EventDecoder>,
}

impl Interest {
    /// Canonical singleton path this interest is registered under.
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Envelope key the encoded message is stored under.
    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    /// Registered message type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Delivery policy for this interest.
    pub fn options(&self) -> DeliveryOptions {
        self.options
    }

    pub(crate) fn decode(&self, text: &str) -> Result<BusEvent, CodecError> {
        self.decoder.decode(text)
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interest")
            .field("path", &self.path)
            .field("type_name", &self.type_name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Mapping from store path to registered interest.
///
/// Built once, before the receiver connects, and read-only afterwards,
/// which is why concurrent lookups need no synchronization.
#[derive(Default)]
pub struct HandlerRegistry {
    interests: HashMap<StorePath, Interest>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in messages of type `T`.
    ///
    /// Registering the same type again replaces the earlier interest for
    /// that path: last registration wins, no error.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidTypeName`] if `T::TYPE_NAME` cannot form
    /// a path.
    pub fn register<T: BusMessage>(
        &mut self,
        codec: impl MessageCodec,
        options: DeliveryOptions,
    ) -> Result<(), PathError> {
        let path = StorePath::for_type_name(T::TYPE_NAME)?;
        let interest = Interest {
            object_key: path.object_key().to_string(),
            type_name: T::TYPE_NAME,
            options,
            decoder: Rc::new(TypedDecoder::<T, _> {
                codec,
                _marker: PhantomData,
            }),
            path,
        };
        self.interests.insert(interest.path.clone(), interest);
        Ok(())
    }

    /// Resolve an incoming path to a registered interest.
    ///
    /// Tries an exact match first. Failing that, a path whose trailing
    /// segment is a typed instance id is matched against its base, so
    /// unique-instance sends reach the interest registered for their type.
    /// Unrelated paths that merely share a prefix never match.
    pub fn lookup(&self, path: &StorePath) -> Option<&Interest> {
        if let Some(interest) = self.interests.get(path) {
            return Some(interest);
        }
        let (base, _id) = path.split_instance()?;
        self.interests.get(&base)
    }

    /// Iterate over all registered interests.
    pub fn interests(&self) -> impl Iterator<Item = &Interest> {
        self.interests.values()
    }

    /// Number of registered interests.
    pub fn len(&self) -> usize {
        self.interests.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::codec::JsonCodec;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Ping {
        seq: u32,
    }

    impl BusMessage for Ping {
        const TYPE_NAME: &'static str = "net::Ping";
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Pong {
        seq: u32,
    }

    impl BusMessage for Pong {
        const TYPE_NAME: &'static str = "net::Pong";
    }

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).expect("valid path")
    }

    #[test]
    fn test_exact_lookup() {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Ping>(JsonCodec, DeliveryOptions::new())
            .expect("register");

        let interest = registry.lookup(&path("/net/Ping")).expect("match");
        assert_eq!(interest.type_name(), "net::Ping");
        assert_eq!(interest.object_key(), "net/Ping");
    }

    #[test]
    fn test_unique_instance_lookup_falls_back_to_base() {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Ping>(JsonCodec, DeliveryOptions::new())
            .expect("register");

        let interest = registry
            .lookup(&path("/net/Ping/1704067200000"))
            .expect("suffixed path matches its base");
        assert_eq!(interest.path().as_str(), "/net/Ping");
    }

    #[test]
    fn test_partial_prefix_does_not_match() {
        #[derive(Serialize, Deserialize)]
        struct B;
        impl BusMessage for B {
            const TYPE_NAME: &'static str = "a::b";
        }

        let mut registry = HandlerRegistry::new();
        registry
            .register::<B>(JsonCodec, DeliveryOptions::new())
            .expect("register");

        assert!(registry.lookup(&path("/a/bb")).is_none());
        assert!(registry.lookup(&path("/a/b/extra")).is_none());
        assert!(registry.lookup(&path("/a")).is_none());
    }

    #[test]
    fn test_unregistered_path_misses() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup(&path("/net/Ping")).is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Ping>(JsonCodec, DeliveryOptions::new())
            .expect("register");
        registry
            .register::<Ping>(JsonCodec, DeliveryOptions::new().sticky())
            .expect("re-register");

        assert_eq!(registry.len(), 1);
        let interest = registry.lookup(&path("/net/Ping")).expect("match");
        assert!(interest.options().sticky);
    }

    #[test]
    fn test_decoder_produces_typed_event() {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Ping>(JsonCodec, DeliveryOptions::new())
            .expect("register");

        let interest = registry.lookup(&path("/net/Ping")).expect("match");
        let event = interest.decode(r#"{"seq":9}"#).expect("decode");
        assert_eq!(event.downcast::<Ping>(), Some(&Ping { seq: 9 }));

        assert!(interest.decode("not json").is_err());
    }

    #[test]
    fn test_distinct_types_keep_distinct_interests() {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Ping>(JsonCodec, DeliveryOptions::new())
            .expect("register");
        registry
            .register::<Pong>(JsonCodec, DeliveryOptions::new())
            .expect("register");

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(&path("/net/Ping")).is_some());
        assert!(registry.lookup(&path("/net/Pong")).is_some());
    }
}
