//! Receiver side: change routing onto the local bus.
//!
//! The [`BridgeProxy`] consumes the store's event stream and republishes
//! matching changes onto the local bus:
//!
//! 1. **Resolve**: look the incoming path up in the [`HandlerRegistry`]
//!    (exact match, then typed instance-id fallback). No match means the
//!    change belongs to some other mirror on the same transport.
//! 2. **Decode**: pull the message text out of the envelope and decode it
//!    into the registered type. Failures are dropped and logged; a schema
//!    mismatch between peers is an operator problem, not a crash.
//! 3. **Publish**: exactly once per decoded change, sticky or plain per
//!    the registered [`DeliveryOptions`].
//! 4. **Post-actions**: mirror into the local cache slot, then delete the
//!    remote item, in that order.
//!
//! On the first `Connected` of the process the proxy replays local cache
//! slots so subscribers are rehydrated after a restart, without triggering
//! any post-actions.

/// Counters for receiver-side behavior.
pub mod metrics;

/// Proxy event loop and change routing.
pub mod proxy;

/// Registered interests and path lookup.
pub mod registry;

mod replay;

pub use metrics::ProxyMetrics;
pub use proxy::BridgeProxy;
pub use registry::{DeliveryOptions, HandlerRegistry, Interest};
