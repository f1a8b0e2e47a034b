//! # mirrorbus
//!
//! One-way, best-effort bridge between the local publish/subscribe buses of
//! two intermittently-connected peer devices, using a replicated key-value
//! store as the only channel between them.
//!
//! This crate provides:
//! - **[`BridgeGateway`]**: sender-side policy engine for singleton vs
//!   unique-instance addressing and forced vs change-deduplicated delivery
//! - **[`BridgeProxy`]**: receiver-side change router with local-cache
//!   cold-start replay
//! - **[`StorePath`] / [`Envelope`]**: the addressing and payload scheme
//!   both sides share
//! - **[`ReplicatedStore`] / [`LocalBus`] / [`MessageCodec`] /
//!   [`WallClock`]**: the seams where the transport, the local bus,
//!   serialization and time plug in
//!
//! # How a message crosses
//!
//! The sender derives a path from the message type's registered name
//! (`telemetry::BatteryStatus` → `/telemetry/BatteryStatus`), wraps the
//! encoded message in an [`Envelope`] and writes it to the store. The
//! receiver, which registered interest in the same type before connecting,
//! sees the change on the store's event stream, decodes the envelope and
//! republishes the message on its own bus, sticky or plain.
//! Optional per-type post-actions mirror the delivered value into a local
//! cache slot (replayed on the next cold start) and delete the remote item
//! once read.
//!
//! Delivery is best-effort per type: no ordering across types and no
//! delivery guarantee; request/response is out of scope entirely. The
//! transport may coalesce or suppress identical writes; that suppression
//! is exactly what `*_only_if_changed` sends lean on, and what the forcing
//! field of `*_always` sends defeats.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Local bus seam and type-erased bridged events.
pub mod bus;

/// Wall-clock provider for forcing timestamps and instance ids.
pub mod clock;

/// Pluggable message serialization.
pub mod codec;

/// Bridge configuration.
pub mod config;

/// Connection lifecycle states.
pub mod connection;

/// Envelope layout for payloads written to the store.
pub mod envelope;

/// Error types for the bridge core.
pub mod error;

/// Store path derivation and unique-instance addressing.
pub mod path;

/// Receiver side: change routing onto the local bus.
pub mod receiver;

/// Sender side: policy-driven writes into the store.
pub mod sender;

/// Replicated key-value transport seam.
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

// Seams
pub use bus::{BusEvent, BusMessage, LocalBus};
pub use clock::{SystemClock, WallClock};
pub use codec::{CodecError, JsonCodec, MessageCodec};
pub use store::{MemoryStore, ReplicatedStore, StoreError, StoreEvent, StoreEvents};

// Addressing and payloads
pub use envelope::{Envelope, EnvelopeError, FORCING_FIELD};
pub use path::{PathError, StorePath};

// Sender side
pub use sender::{BridgeGateway, GatewayMetrics};

// Receiver side
pub use receiver::{BridgeProxy, DeliveryOptions, HandlerRegistry, Interest, ProxyMetrics};

// Shared
pub use config::BridgeConfig;
pub use connection::ConnectionState;
pub use error::BridgeError;
