//! Bridge configuration.

/// Configuration shared by both sides of the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// First path segment of local cache slots: the cached copy of `/a/B`
    /// lives at `/<local_namespace>/a/B`. Must be a single path segment.
    ///
    /// Slots are read back by the same process that wrote them, never by
    /// the peer, so the namespace only has to be stable per device.
    pub local_namespace: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            local_namespace: "local".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Override the local-cache namespace segment.
    pub fn with_local_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.local_namespace = namespace.into();
        self
    }
}
