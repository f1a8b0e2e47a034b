//! Wall-clock provider for forcing timestamps and instance ids.
//!
//! The bridge needs time for exactly two things: stamping the forcing field
//! of "always send" envelopes, and deriving unique-instance ids for
//! per-send addressing. Both consume milliseconds since the UNIX epoch.
//! The provider trait keeps tests deterministic: a manual clock can be
//! swapped in wherever [`SystemClock`] would run in production.

/// Provider trait for wall-clock readings.
///
/// Implementations must be cheap to clone; the gateway keeps one for its
/// whole lifetime. No sleeping or timeout facilities live here; the bridge
/// imposes no timeouts of its own, the transport owns that policy.
pub trait WallClock: Clone + 'static {
    /// Current wall-clock time in milliseconds since the UNIX epoch.
    fn now_millis(&self) -> u64;
}

/// Production clock backed by [`std::time::SystemTime`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_millis(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};

        // A clock set before the epoch reads as zero; senders bump
        // monotonically on top of whatever this returns.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}
