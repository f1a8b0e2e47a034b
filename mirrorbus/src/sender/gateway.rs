//! Send-policy engine: resolves target path and payload shape per send.

use tracing::{debug, info, warn};

use super::metrics::GatewayMetrics;
use crate::bus::BusMessage;
use crate::clock::WallClock;
use crate::codec::MessageCodec;
use crate::connection::ConnectionState;
use crate::envelope::Envelope;
use crate::error::BridgeError;
use crate::path::StorePath;
use crate::store::ReplicatedStore;

/// Sender half of the bridge.
///
/// Serializes typed messages and writes them into the replicated store
/// under paths derived from their type names. Construct one per transport
/// session and drive its lifecycle from the application's foreground hooks:
/// [`resume`](Self::resume) to connect, [`pause`](Self::pause) to
/// disconnect.
///
/// Path derivation is idempotent: the same type in singleton mode always
/// resolves to the same path. A successful send means the local write was
/// acknowledged; whether it reaches the peer is the transport's business,
/// and nothing is retried here.
pub struct BridgeGateway<S, C, K>
where
    S: ReplicatedStore,
    C: MessageCodec,
    K: WallClock,
{
    store: S,
    codec: C,
    clock: K,
    state: ConnectionState,
    last_instance_id: u64,
    last_forced_at: u64,
    metrics: GatewayMetrics,
}

impl<S, C, K> BridgeGateway<S, C, K>
where
    S: ReplicatedStore,
    C: MessageCodec,
    K: WallClock,
{
    /// Create a gateway over `store`. No connection is attempted until
    /// [`resume`](Self::resume).
    pub fn new(store: S, codec: C, clock: K) -> Self {
        Self {
            store,
            codec,
            clock,
            state: ConnectionState::Disconnected,
            last_instance_id: 0,
            last_forced_at: 0,
            metrics: GatewayMetrics::new(),
        }
    }

    /// Connect the underlying store. Idempotent while connected.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connect`] if the transport rejects the
    /// session; the gateway is then in the `Failed` state and `resume` may
    /// be called again.
    pub async fn resume(&mut self) -> Result<(), BridgeError> {
        if self.state.is_connected() {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;
        info!("connecting replicated store");
        let result = self.store.connect().await;
        match result {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("replicated store connected");
                Ok(())
            }
            Err(source) => {
                self.state = ConnectionState::Failed;
                warn!(%source, "replicated store connection failed");
                Err(BridgeError::Connect { source })
            }
        }
    }

    /// Disconnect the underlying store. In-flight sends may still resolve;
    /// their results are no-ops for the transport.
    pub fn pause(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.store.disconnect();
        self.state = ConnectionState::Disconnected;
        info!("replicated store disconnected");
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Counters for sends issued so far.
    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Send to a fresh per-send slot, forcing delivery even if the payload
    /// is identical to the previous send.
    ///
    /// # Errors
    ///
    /// See [`sync_only_if_changed`](Self::sync_only_if_changed).
    pub async fn send_always<T: BusMessage>(
        &mut self,
        message: &T,
    ) -> Result<StorePath, BridgeError> {
        self.send(message, true, true).await
    }

    /// Send to a fresh per-send slot; the transport may suppress the write
    /// if the payload is unchanged.
    ///
    /// # Errors
    ///
    /// See [`sync_only_if_changed`](Self::sync_only_if_changed).
    pub async fn send_only_if_changed<T: BusMessage>(
        &mut self,
        message: &T,
    ) -> Result<StorePath, BridgeError> {
        self.send(message, false, true).await
    }

    /// Overwrite the type's singleton slot, forcing delivery even if the
    /// payload is identical to the previous send.
    ///
    /// # Errors
    ///
    /// See [`sync_only_if_changed`](Self::sync_only_if_changed).
    pub async fn sync_always<T: BusMessage>(
        &mut self,
        message: &T,
    ) -> Result<StorePath, BridgeError> {
        self.send(message, true, false).await
    }

    /// Overwrite the type's singleton slot; an unchanged payload is not
    /// delivered to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Path`] if the type name cannot form a path,
    /// [`BridgeError::Encode`] if the message cannot be serialized, or
    /// [`BridgeError::Store`] carrying the resolved path and the
    /// transport's reported status if the write fails.
    pub async fn sync_only_if_changed<T: BusMessage>(
        &mut self,
        message: &T,
    ) -> Result<StorePath, BridgeError> {
        self.send(message, false, false).await
    }

    async fn send<T: BusMessage>(
        &mut self,
        message: &T,
        always_send: bool,
        unique_instance: bool,
    ) -> Result<StorePath, BridgeError> {
        let base = StorePath::for_type_name(T::TYPE_NAME)?;
        let path = if unique_instance {
            let id = self.next_instance_id();
            base.with_instance(id)
        } else {
            base.clone()
        };

        let text = self.codec.encode(message).map_err(BridgeError::Encode)?;

        let envelope = if always_send {
            let stamp = self.next_forcing_stamp();
            Envelope::forced(base.object_key(), text, stamp)
        } else {
            Envelope::new(base.object_key(), text)
        };

        debug!(path = %path, forced = always_send, "writing envelope");
        match self.store.write(&path, envelope.to_bytes()).await {
            Ok(()) => {
                self.metrics.record_write(always_send, unique_instance);
                Ok(path)
            }
            Err(source) => {
                self.metrics.record_write_failure();
                warn!(path = %path, %source, "store write failed");
                Err(BridgeError::Store { path, source })
            }
        }
    }

    /// Next unique-instance id: wall-clock milliseconds, bumped so ids stay
    /// strictly increasing within this process even when the clock stalls.
    fn next_instance_id(&mut self) -> u64 {
        let id = self.clock.now_millis().max(self.last_instance_id + 1);
        self.last_instance_id = id;
        id
    }

    /// Next forcing timestamp. Never reuses a value, so the envelope bytes
    /// always differ from the previous forced send at the same path.
    fn next_forcing_stamp(&mut self) -> u64 {
        let stamp = self.clock.now_millis().max(self.last_forced_at + 1);
        self.last_forced_at = stamp;
        stamp
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::codec::JsonCodec;
    use crate::store::{MemoryStore, StoreError};

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
    struct Ping {
        seq: u32,
    }

    impl BusMessage for Ping {
        const TYPE_NAME: &'static str = "Ping";
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
    struct Position {
        lat: i64,
        lon: i64,
    }

    impl BusMessage for Position {
        const TYPE_NAME: &'static str = "telemetry::gps::Position";
    }

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<u64>>);

    impl ManualClock {
        fn at(millis: u64) -> Self {
            Self(Rc::new(Cell::new(millis)))
        }
    }

    impl WallClock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.get()
        }
    }

    fn gateway(
        store: &MemoryStore,
        clock: &ManualClock,
    ) -> BridgeGateway<MemoryStore, JsonCodec, ManualClock> {
        BridgeGateway::new(store.clone(), JsonCodec, clock.clone())
    }

    #[tokio::test]
    async fn test_singleton_sends_reuse_one_path() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(1_000);
        let mut gateway = gateway(&store, &clock);
        gateway.resume().await.expect("resume");

        let first = gateway.sync_only_if_changed(&Ping { seq: 1 }).await.expect("send");
        let second = gateway.sync_only_if_changed(&Ping { seq: 2 }).await.expect("send");

        assert_eq!(first.as_str(), "/Ping");
        assert_eq!(first, second);
        assert_eq!(store.len(), 1, "later send overwrites the singleton slot");
    }

    #[tokio::test]
    async fn test_unique_sends_occupy_distinct_slots() {
        let store = MemoryStore::new();
        // Frozen clock: distinctness must come from the monotonic bump.
        let clock = ManualClock::at(5_000);
        let mut gateway = gateway(&store, &clock);
        gateway.resume().await.expect("resume");

        let first = gateway.send_only_if_changed(&Ping { seq: 1 }).await.expect("send");
        let second = gateway.send_only_if_changed(&Ping { seq: 1 }).await.expect("send");

        assert_eq!(first.as_str(), "/Ping/5000");
        assert_eq!(second.as_str(), "/Ping/5001");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_unforced_send_omits_forcing_field() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(1_000);
        let mut gateway = gateway(&store, &clock);
        gateway.resume().await.expect("resume");

        let path = gateway.sync_only_if_changed(&Ping { seq: 1 }).await.expect("send");
        let payload = store.peek(&path).expect("stored");
        let envelope = Envelope::from_bytes(&payload, "Ping").expect("envelope");
        assert_eq!(envelope.forced_at(), None);
    }

    #[tokio::test]
    async fn test_forcing_stamps_never_repeat() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(1_000);
        let mut gateway = gateway(&store, &clock);
        gateway.resume().await.expect("resume");

        let path = gateway.sync_always(&Ping { seq: 1 }).await.expect("send");
        let first = Envelope::from_bytes(&store.peek(&path).expect("stored"), "Ping")
            .expect("envelope")
            .forced_at()
            .expect("forced");

        // The clock has not moved; the stamp must still advance.
        gateway.sync_always(&Ping { seq: 1 }).await.expect("send");
        let second = Envelope::from_bytes(&store.peek(&path).expect("stored"), "Ping")
            .expect("envelope")
            .forced_at()
            .expect("forced");

        assert_eq!(first, 1_000);
        assert_eq!(second, 1_001);
    }

    #[tokio::test]
    async fn test_nested_type_name_derives_nested_path() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(1_000);
        let mut gateway = gateway(&store, &clock);
        gateway.resume().await.expect("resume");

        let path = gateway
            .sync_only_if_changed(&Position { lat: 59, lon: 18 })
            .await
            .expect("send");
        assert_eq!(path.as_str(), "/telemetry/gps/Position");

        let payload = store.peek(&path).expect("stored");
        let envelope =
            Envelope::from_bytes(&payload, "telemetry/gps/Position").expect("envelope");
        let decoded: Position =
            serde_json::from_str(envelope.message()).expect("message text is the encoded value");
        assert_eq!(decoded, Position { lat: 59, lon: 18 });
    }

    #[tokio::test]
    async fn test_send_before_resume_reports_path_and_status() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(1_000);
        let mut gateway = gateway(&store, &clock);

        let err = gateway
            .sync_only_if_changed(&Ping { seq: 1 })
            .await
            .expect_err("store is not connected");
        match err {
            BridgeError::Store { path, source } => {
                assert_eq!(path.as_str(), "/Ping");
                assert_eq!(source, StoreError::NotConnected);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gateway.metrics().write_failures, 1);
    }

    #[tokio::test]
    async fn test_metrics_track_policy_knobs() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(1_000);
        let mut gateway = gateway(&store, &clock);
        gateway.resume().await.expect("resume");

        gateway.send_always(&Ping { seq: 1 }).await.expect("send");
        gateway.sync_only_if_changed(&Ping { seq: 2 }).await.expect("send");

        let metrics = gateway.metrics();
        assert_eq!(metrics.writes, 2);
        assert_eq!(metrics.forced_sends, 1);
        assert_eq!(metrics.unique_sends, 1);
    }

    #[tokio::test]
    async fn test_pause_and_resume_track_state() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(1_000);
        let mut gateway = gateway(&store, &clock);

        assert_eq!(gateway.state(), ConnectionState::Disconnected);
        gateway.resume().await.expect("resume");
        assert_eq!(gateway.state(), ConnectionState::Connected);
        assert!(store.is_connected());

        gateway.pause();
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
        assert!(!store.is_connected());
    }
}
