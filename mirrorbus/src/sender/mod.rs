//! Sender side: policy-driven writes into the replicated store.
//!
//! The [`BridgeGateway`] turns typed messages into envelopes at derived
//! paths. Two independent policy knobs apply per send:
//!
//! - **always vs only-if-changed**: "always" stamps a forcing timestamp
//!   into the envelope so a content-hashing transport delivers the write
//!   even when the message itself did not change.
//! - **unique-instance vs singleton**: unique-instance sends append a
//!   strictly increasing id so every send lands on its own path; singleton
//!   sends reuse one path per type, overwriting the previous value.

/// Gateway implementation.
pub mod gateway;

/// Counters for sender-side behavior.
pub mod metrics;

pub use gateway::BridgeGateway;
pub use metrics::GatewayMetrics;
