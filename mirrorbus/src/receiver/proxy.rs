//! Receiver event loop: routes store changes onto the local bus.

use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use super::metrics::ProxyMetrics;
use super::registry::{DeliveryOptions, HandlerRegistry};
use super::replay;
use crate::bus::{BusMessage, LocalBus};
use crate::codec::MessageCodec;
use crate::config::BridgeConfig;
use crate::connection::ConnectionState;
use crate::envelope::Envelope;
use crate::error::BridgeError;
use crate::path::StorePath;
use crate::store::{ReplicatedStore, StoreEvent, StoreEvents};

/// Receiver half of the bridge.
///
/// Watches the store's event stream, matches changed paths against the
/// handler registry, decodes payloads and republishes them on the local
/// bus. Per interest it optionally mirrors the delivered value into a local
/// cache slot and deletes the remote item once read. On the first connect
/// of the process it replays cached values so local subscribers come back
/// up with the last known state after a restart.
///
/// Register every handler before [`connect`](Self::connect); the registry
/// is built once and is read-only while the session is up. Drive the proxy
/// with [`run`](Self::run) as a long-lived task, or with
/// [`drain_pending`](Self::drain_pending) for step-by-step processing.
///
/// Events are handled strictly in arrival order, which preserves the
/// transport's per-path delivery order; events for unknown paths are
/// expected noise from other mirrors sharing the transport and are dropped
/// without fuss.
pub struct BridgeProxy<S, B, C>
where
    S: ReplicatedStore,
    B: LocalBus,
    C: MessageCodec,
{
    store: S,
    bus: B,
    codec: C,
    config: BridgeConfig,
    registry: HandlerRegistry,
    events: StoreEvents,
    state: ConnectionState,
    replay_done: bool,
    metrics: ProxyMetrics,
}

impl<S, B, C> BridgeProxy<S, B, C>
where
    S: ReplicatedStore,
    B: LocalBus,
    C: MessageCodec,
{
    /// Create a proxy over `store`, republishing onto `bus`.
    ///
    /// The event subscription is taken here, before any connect, so no
    /// change can slip past between connecting and the first poll.
    pub fn new(store: S, bus: B, codec: C, config: BridgeConfig) -> Self {
        let events = store.events();
        Self {
            store,
            bus,
            codec,
            config,
            registry: HandlerRegistry::new(),
            events,
            state: ConnectionState::Disconnected,
            replay_done: false,
            metrics: ProxyMetrics::new(),
        }
    }

    /// Register interest in messages of type `T`.
    ///
    /// Registering a type twice keeps the last registration.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidState`] once [`connect`](Self::connect)
    /// has been called (the registry is built before the session and never
    /// mutated afterwards), and [`BridgeError::Path`] if `T::TYPE_NAME`
    /// cannot form a path.
    pub fn register_handler<T: BusMessage>(
        &mut self,
        options: DeliveryOptions,
    ) -> Result<(), BridgeError> {
        if self.state != ConnectionState::Disconnected {
            return Err(BridgeError::InvalidState {
                message: format!("cannot register {} after connect", T::TYPE_NAME),
            });
        }
        self.registry.register::<T>(self.codec.clone(), options)?;
        debug!(type_name = T::TYPE_NAME, options = ?options, "handler registered");
        Ok(())
    }

    /// Open the transport session. Idempotent while connected.
    ///
    /// The `Connected` transition itself arrives on the event stream; the
    /// first one per process triggers the cold-start replay.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connect`] if the transport rejects the
    /// session.
    pub async fn connect(&mut self) -> Result<(), BridgeError> {
        if self.state.is_connected() {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;
        info!(handlers = self.registry.len(), "connecting replicated store");
        let result = self.store.connect().await;
        match result {
            Ok(()) => Ok(()),
            Err(source) => {
                self.state = ConnectionState::Failed;
                warn!(%source, "replicated store connection failed");
                Err(BridgeError::Connect { source })
            }
        }
    }

    /// Close the transport session. Events already queued are still
    /// processed by the next poll and tolerated as no-ops where they no
    /// longer apply.
    pub fn disconnect(&mut self) {
        self.store.disconnect();
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Counters for routed traffic.
    pub fn metrics(&self) -> &ProxyMetrics {
        &self.metrics
    }

    /// Process store events until the stream closes.
    pub async fn run(&mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await;
        }
        info!("store event stream closed");
    }

    /// Process every event already queued, returning how many were handled.
    ///
    /// Events produced while handling (cache writes, deletes) are picked up
    /// within the same call. Useful wherever deterministic stepping beats a
    /// background task, tests in particular.
    pub async fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle_event(event).await;
                    handled += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    async fn handle_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Connected => {
                self.state = ConnectionState::Connected;
                info!("replicated store connected");
                if !self.replay_done {
                    // Flag first: a second Connected arriving mid-replay
                    // must not start a second pass.
                    self.replay_done = true;
                    let replayed = replay::replay_local_cache(
                        &self.registry,
                        &self.store,
                        &self.bus,
                        &self.config,
                        &mut self.metrics,
                    )
                    .await;
                    info!(replayed, "cold-start replay finished");
                }
            }
            StoreEvent::Disconnected => {
                self.state = ConnectionState::Disconnected;
                info!("replicated store disconnected");
            }
            StoreEvent::ConnectionSuspended { cause } => {
                self.state = ConnectionState::Suspended;
                warn!(%cause, "replicated store suspended");
            }
            StoreEvent::ConnectionFailed { reason } => {
                self.state = ConnectionState::Failed;
                warn!(%reason, "replicated store connection failed");
            }
            StoreEvent::Changed { path, payload } => {
                self.metrics.changes_seen += 1;
                self.route_change(path, payload).await;
            }
            StoreEvent::Deleted { path } => {
                self.metrics.deleted_events += 1;
                debug!(path = %path, "remote item deleted");
            }
            StoreEvent::PeerConnected { node } => {
                info!(%node, "peer connected");
            }
            StoreEvent::PeerDisconnected { node } => {
                info!(%node, "peer disconnected");
            }
        }
    }

    /// Route one changed item: resolve, decode, publish, post-actions.
    async fn route_change(&mut self, path: StorePath, payload: Vec<u8>) {
        let Some(interest) = self.registry.lookup(&path).cloned() else {
            debug!(path = %path, "no handler for changed path");
            self.metrics.unrouted += 1;
            return;
        };

        let envelope = match Envelope::from_bytes(&payload, interest.object_key()) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(path = %path, %error, "envelope rejected; peers may disagree on schema");
                self.metrics.decode_failures += 1;
                return;
            }
        };

        let event = match interest.decode(envelope.message()) {
            Ok(event) => event,
            Err(error) => {
                warn!(
                    path = %path,
                    type_name = interest.type_name(),
                    %error,
                    "message rejected; peers may disagree on schema"
                );
                self.metrics.decode_failures += 1;
                return;
            }
        };

        let options = interest.options();
        debug!(path = %path, type_name = interest.type_name(), sticky = options.sticky, "republishing");
        if options.sticky {
            self.bus.publish_sticky(event);
        } else {
            self.bus.publish(event);
        }
        self.metrics.published += 1;

        // Cache before delete: the slot must hold the delivered value even
        // if the delete below fails.
        if options.cache_locally {
            let slot = interest.path().local_slot(&self.config.local_namespace);
            let cached = Envelope::new(interest.object_key(), envelope.message());
            self.metrics.cache_writes += 1;
            if let Err(error) = self.store.write(&slot, cached.to_bytes()).await {
                warn!(slot = %slot, %error, "local cache write failed");
                self.metrics.cache_write_failures += 1;
            }
        }

        if options.delete_on_read {
            self.metrics.deletes_issued += 1;
            // The exact incoming path, instance suffix included.
            if let Err(error) = self.store.delete(&path).await {
                warn!(path = %path, %error, "delete-on-read failed; item may be redelivered");
                self.metrics.delete_failures += 1;
            }
        }
    }
}
