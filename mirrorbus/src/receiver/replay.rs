//! Cold-start replay from local cache slots.

use tracing::{debug, warn};

use super::metrics::ProxyMetrics;
use super::registry::HandlerRegistry;
use crate::bus::LocalBus;
use crate::config::BridgeConfig;
use crate::envelope::Envelope;
use crate::store::ReplicatedStore;

/// Republish the last delivered value of every cached interest.
///
/// Runs on the first connect of the process: for each registered interest,
/// read its local cache slot and publish the stored value exactly as a
/// fresh delivery would, minus the post-actions. Nothing is re-cached and
/// nothing is deleted; this path rehydrates local subscribers after a
/// restart, it does not re-trigger side effects meant for remote changes.
///
/// An absent slot is the normal case for an interest that has never
/// received data; read failures are skipped the same way. Returns the
/// number of replayed messages.
pub(super) async fn replay_local_cache<S, B>(
    registry: &HandlerRegistry,
    store: &S,
    bus: &B,
    config: &BridgeConfig,
    metrics: &mut ProxyMetrics,
) -> u64
where
    S: ReplicatedStore,
    B: LocalBus,
{
    let mut replayed = 0;
    for interest in registry.interests() {
        let slot = interest.path().local_slot(&config.local_namespace);
        let payload = match store.read(&slot).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(slot = %slot, "no cached value");
                continue;
            }
            Err(error) => {
                debug!(slot = %slot, %error, "cache read failed");
                continue;
            }
        };

        let envelope = match Envelope::from_bytes(&payload, interest.object_key()) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(slot = %slot, %error, "cached envelope rejected");
                metrics.decode_failures += 1;
                continue;
            }
        };
        let event = match interest.decode(envelope.message()) {
            Ok(event) => event,
            Err(error) => {
                warn!(slot = %slot, type_name = interest.type_name(), %error, "cached message rejected");
                metrics.decode_failures += 1;
                continue;
            }
        };

        debug!(slot = %slot, type_name = interest.type_name(), "replaying cached value");
        if interest.options().sticky {
            bus.publish_sticky(event);
        } else {
            bus.publish(event);
        }
        metrics.published += 1;
        metrics.replayed += 1;
        replayed += 1;
    }
    replayed
}
