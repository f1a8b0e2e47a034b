//! Counters for sender-side behavior.

/// Counters describing what a gateway has sent.
#[derive(Debug, Clone, Default)]
pub struct GatewayMetrics {
    /// Writes acknowledged by the store.
    pub writes: u64,

    /// Writes the store reported as failed.
    pub write_failures: u64,

    /// Sends that carried the forcing field.
    pub forced_sends: u64,

    /// Sends addressed to a unique per-send path.
    pub unique_sends: u64,
}

impl GatewayMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write the store acknowledged.
    pub fn record_write(&mut self, forced: bool, unique: bool) {
        self.writes += 1;
        if forced {
            self.forced_sends += 1;
        }
        if unique {
            self.unique_sends += 1;
        }
    }

    /// Record a write the store reported as failed.
    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }
}
