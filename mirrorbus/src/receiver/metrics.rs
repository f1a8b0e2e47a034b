//! Counters for receiver-side behavior.

/// Counters describing what a proxy has routed.
///
/// Every drop reason gets its own counter: a rising `unrouted` is expected
/// noise from other mirrors sharing the transport, while rising
/// `decode_failures` means the peers disagree on a schema.
#[derive(Debug, Clone, Default)]
pub struct ProxyMetrics {
    /// Change events seen on the store stream.
    pub changes_seen: u64,

    /// Events republished on the local bus, replay included.
    pub published: u64,

    /// Changes dropped because no interest matched the path.
    pub unrouted: u64,

    /// Changes dropped because the envelope or the message failed to
    /// decode.
    pub decode_failures: u64,

    /// Delete requests issued for delete-on-read interests.
    pub deletes_issued: u64,

    /// Delete requests the store reported as failed.
    pub delete_failures: u64,

    /// Local cache writes issued.
    pub cache_writes: u64,

    /// Local cache writes the store reported as failed.
    pub cache_write_failures: u64,

    /// Messages rehydrated from the local cache on first connect.
    pub replayed: u64,

    /// Deleted events observed. No action is ever taken on them.
    pub deleted_events: u64,
}

impl ProxyMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }
}
