//! Link-state routing (SPEC_FULL.md §4.4): flooding of local adjacency and liveness,
//! a monotone-merged alive table, and Dijkstra over the resulting global link-state
//! database.

use std::sync::Arc;

use async_trait::async_trait;

use crate::messages::LsFloodPayload;
use crate::time::Timestamp;
use crate::transport::Payload;
use crate::types::Hostname;

use super::dijkstra::{derive_routing, shortest_paths};
use super::{AlgorithmCore, LinkState, Variant};

/// The link-state [`Variant`].
#[derive(Default)]
pub struct Ls;

impl Ls {
    /// Runs Dijkstra from `core.hostname` over the current link-state DB and publishes
    /// the resulting routing table (SPEC_FULL.md §4.4 step 5-6). Shared by `on_receive`
    /// and by `CentralizedMember`, which reuses this as a pure function over `(LS,
    /// self)` per SPEC_FULL.md §9.
    pub fn recompute_and_publish(core: &Arc<AlgorithmCore>) {
        let ls = core.link_state_snapshot();
        let pred = shortest_paths(&ls, &core.hostname);
        let routing = derive_routing(&pred, &core.hostname);
        core.with_routing_table(|table| {
            *table = routing;
        });
        core.publish();
    }
}

#[async_trait]
impl Variant for Ls {
    #[tracing::instrument(level = "debug", skip(self, core, payload))]
    async fn on_receive(&self, core: &Arc<AlgorithmCore>, source: Hostname, payload: Payload) {
        let data: LsFloodPayload = match serde_json::from_value(payload) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%source, error = %err, "dropping malformed LS payload");
                return;
            }
        };

        let now = core.now();
        core.with_alive_table(|alive| {
            alive.insert(core.hostname.clone(), now);
            // Monotone merge: never let a received timestamp move a host's last-seen
            // time backwards (SPEC_FULL.md §8 law "monotone alive merge").
            for (host, secs) in &data.alive {
                let incoming = Timestamp(secs.round() as u64);
                let slot = alive.entry(host.clone()).or_insert(incoming);
                if incoming > *slot {
                    *slot = incoming;
                }
            }
        });

        let dead = core.dead_hosts();
        if !dead.is_empty() {
            core.notify_dead(&dead);
            core.purge_dead_from_alive(&dead);
        }

        let local_neighbors: std::collections::BTreeMap<_, _> =
            core.neighbors.get().into_iter().collect();
        let local_endpoints: Vec<_> = local_neighbors.keys().cloned().collect();
        let remote_endpoints: Vec<_> = data.neighbor.keys().cloned().collect();

        core.with_link_state(|ls: &mut LinkState| {
            ls.insert(core.hostname.clone(), local_neighbors);
            for endpoint in local_endpoints {
                ls.entry(endpoint).or_default();
            }

            ls.insert(data.source.clone(), data.neighbor.clone());
            for endpoint in remote_endpoints {
                ls.entry(endpoint).or_default();
            }

            ls.retain(|host, _| !dead.contains(host));
            for inner in ls.values_mut() {
                inner.retain(|host, _| !dead.contains(host));
            }
        });

        Self::recompute_and_publish(core);
    }

    #[tracing::instrument(level = "debug", skip(self, core))]
    async fn on_tick(&self, core: &Arc<AlgorithmCore>) {
        let neighbor: std::collections::BTreeMap<_, _> = core.neighbors.get().into_iter().collect();
        let alive: std::collections::BTreeMap<Hostname, f64> = core
            .alive_table_snapshot()
            .into_iter()
            .map(|(host, ts)| (host, ts.0 as f64))
            .collect();

        let payload = LsFloodPayload {
            source: core.hostname.clone(),
            neighbor,
            alive,
        };
        let body = serde_json::json!({ "type": "algorithm", "data": payload });
        core.transport.broadcast(body).await;
    }
}
