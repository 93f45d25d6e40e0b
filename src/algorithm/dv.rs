//! Distance-vector routing (SPEC_FULL.md §4.3): full routing-table exchange between
//! neighbors with Bellman-Ford-style relaxation, triggered on change.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::messages::{DvPayload, DvRoutingEntryWire};
use crate::transport::Payload;
use crate::types::{Hostname, RoutingEntry};

use super::{AlgorithmCore, RoutingTableSnapshot, Variant};

/// The distance-vector [`Variant`]. Holds no state of its own beyond what
/// [`AlgorithmCore`] already provides; everything here is the relaxation logic that
/// reads and mutates the shared routing/alive tables.
#[derive(Default)]
pub struct Dv;

#[async_trait]
impl Variant for Dv {
    #[tracing::instrument(level = "debug", skip(self, core, payload))]
    async fn on_receive(&self, core: &Arc<AlgorithmCore>, source: Hostname, payload: Payload) {
        let data: DvPayload = match serde_json::from_value(payload) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%source, error = %err, "dropping malformed DV payload");
                return;
            }
        };

        let now = core.now();
        core.with_alive_table(|alive| {
            alive.insert(core.hostname.clone(), now);
            alive.insert(data.source.clone(), now);
        });
        let dead = core.dead_hosts();
        if !dead.is_empty() {
            core.notify_dead(&dead);
            core.purge_dead_from_alive(&dead);
        }

        let mut incoming: BTreeMap<Hostname, DvRoutingEntryWire> = data.routing;
        incoming.retain(|dest, entry| !dead.contains(dest) && !dead.contains(&entry.next));

        let neighbors = core.neighbors.get();
        let mut modified = false;

        core.with_routing_table(|routing| {
            if super::AlgorithmCore::purge_dead_destinations(routing, &dead) {
                modified = true;
            }

            // Seed routing entries for every live neighbor not yet present.
            for (hostname, cost) in &neighbors {
                if dead.contains(hostname) {
                    continue;
                }
                routing
                    .entry(hostname.clone())
                    .or_insert_with(|| RoutingEntry::new(hostname.clone(), *cost));
            }

            let Some(via_entry) = routing.get(&data.source).cloned() else {
                // The ordering guaranteed by the seeding step above means data.source is
                // always present by now; if it is somehow absent, there is nothing safe
                // to relax against, so the advertisement is skipped this round.
                tracing::warn!(source = %data.source, "DV source absent from routing table, skipping relaxation");
                return;
            };

            for (dest, entry) in &incoming {
                if dest == &core.hostname {
                    continue;
                }
                let indirect = via_entry.cost.saturating_add(entry.cost);
                match routing.get(dest) {
                    None => {
                        routing.insert(dest.clone(), RoutingEntry::new(data.source.clone(), indirect));
                        modified = true;
                    }
                    Some(current) if indirect < current.cost => {
                        routing.insert(dest.clone(), RoutingEntry::new(data.source.clone(), indirect));
                        modified = true;
                    }
                    // Equal or worse costs do not overwrite the incumbent.
                    Some(_) => {}
                }
            }
        });

        if modified {
            core.run_triggered_update().await;
        }
        core.publish();
    }

    #[tracing::instrument(level = "debug", skip(self, core))]
    async fn on_tick(&self, core: &Arc<AlgorithmCore>) {
        let snapshot: RoutingTableSnapshot = core.routing_table_snapshot();
        let payload = DvPayload {
            source: core.hostname.clone(),
            routing: snapshot
                .into_iter()
                .map(|(dest, entry)| {
                    (
                        dest,
                        DvRoutingEntryWire {
                            next: entry.next_hop,
                            cost: entry.cost,
                        },
                    )
                })
                .collect(),
        };
        let body = serde_json::json!({ "type": "algorithm", "data": payload });

        for (hostname, _) in core.neighbors.get() {
            core.transport.send(&hostname, body.clone(), true).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::algorithm::AlgorithmCore;
    use crate::neighbors::Neighbors;
    use crate::time::FakeClock;
    use crate::transport::{NeighborStorage, Payload, RoutingModel, Transport};
    use crate::types::{Cost, Hostname, RoutingEntry};

    use super::*;

    #[derive(Debug, Default)]
    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send(&self, _hostname: &Hostname, _payload: Payload, _is_new: bool) {}
        async fn broadcast(&self, _payload: Payload) {}
    }

    #[derive(Debug, Default)]
    struct NullRoutingModel;

    impl RoutingModel for NullRoutingModel {
        fn update(&self, _full_table: &RoutingTableSnapshot) {}
        fn update_one(&self, _destination: &Hostname, _next_hop: &Hostname, _cost: Cost) {}
    }

    #[derive(Debug, Default)]
    struct FakeNeighborStorage(Mutex<HashMap<Hostname, Cost>>);

    impl NeighborStorage for FakeNeighborStorage {
        fn get_cost(&self, hostname: &Hostname) -> Option<Cost> {
            self.0.lock().get(hostname).copied()
        }
        fn update(&self, hostname: Hostname, cost: Cost) {
            self.0.lock().insert(hostname, cost);
        }
        fn remove(&self, hostname: &Hostname) {
            self.0.lock().remove(hostname);
        }
        fn enumerate(&self) -> Vec<(Hostname, Cost)> {
            self.0
                .lock()
                .iter()
                .map(|(h, c)| (h.clone(), *c))
                .collect()
        }
    }

    fn core_with_neighbor(hostname: &str, neighbor: &str, cost: Cost) -> Arc<AlgorithmCore> {
        let clock = Arc::new(FakeClock::new(0));
        let storage = Arc::new(FakeNeighborStorage::default());
        storage.update(Hostname::from(neighbor), cost);
        let neighbors = Neighbors::new_with_clock(
            Arc::new(NullTransport),
            storage,
            3,
            Duration::from_secs(10),
            clock.clone() as Arc<dyn crate::time::Clock>,
        );
        AlgorithmCore::new_with_clock(
            Hostname::from(hostname),
            Duration::from_secs(30),
            Duration::from_secs(180),
            neighbors,
            Arc::new(NullTransport),
            Arc::new(NullRoutingModel),
            clock,
        )
    }

    #[tokio::test]
    async fn relaxation_prefers_cheaper_indirect_path() {
        let core = core_with_neighbor("A", "B", Cost(1));

        let payload = serde_json::json!({
            "source": "B",
            "routing": {
                "C": { "next": "C", "cost": 1 },
            },
        });
        Dv.on_receive(&core, Hostname::from("B"), payload).await;

        let table = core.routing_table_snapshot();
        let c = table.get(&Hostname::from("C")).expect("C present");
        assert_eq!(c.next_hop, Hostname::from("B"));
        assert_eq!(c.cost, Cost(2));
    }

    #[tokio::test]
    async fn equal_cost_keeps_incumbent() {
        let core = core_with_neighbor("A", "B", Cost(1));
        core.with_routing_table(|routing| {
            routing.insert(Hostname::from("C"), RoutingEntry::new(Hostname::from("D"), Cost(2)));
        });

        let payload = serde_json::json!({
            "source": "B",
            "routing": {
                "C": { "next": "C", "cost": 1 },
            },
        });
        Dv.on_receive(&core, Hostname::from("B"), payload).await;

        let table = core.routing_table_snapshot();
        let c = table.get(&Hostname::from("C")).expect("C present");
        assert_eq!(c.next_hop, Hostname::from("D"));
        assert_eq!(c.cost, Cost(2));
    }

    #[tokio::test]
    async fn self_entry_survives_relaxation() {
        let core = core_with_neighbor("A", "B", Cost(1));
        let payload = serde_json::json!({ "source": "B", "routing": {} });
        Dv.on_receive(&core, Hostname::from("B"), payload).await;

        let table = core.routing_table_snapshot();
        let self_entry = table.get(&Hostname::from("A")).expect("self entry present");
        assert_eq!(self_entry.next_hop, Hostname::from("A"));
        assert_eq!(self_entry.cost, Cost::ZERO);
    }
}
