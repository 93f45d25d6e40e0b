//! The centralized controller (SPEC_FULL.md §4.6): collects per-member adjacency
//! reports, aggregates them into the global link-state database, and redistributes the
//! full database to every live member. Computes no routing table of its own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::messages::{ControllerDbPayload, MemberReportPayload};
use crate::transport::Payload;
use crate::types::Hostname;

use super::super::{AlgorithmCore, LinkState, Variant};

/// The centralized-controller [`Variant`].
#[derive(Default)]
pub struct Controller;

#[async_trait]
impl Variant for Controller {
    #[tracing::instrument(level = "debug", skip(self, core, payload))]
    async fn on_receive(&self, core: &Arc<AlgorithmCore>, source: Hostname, payload: Payload) {
        let data: MemberReportPayload = match serde_json::from_value(payload) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%source, error = %err, "dropping malformed member report");
                return;
            }
        };

        let now = core.now();
        core.with_alive_table(|alive| {
            alive.insert(data.source.clone(), now);
        });
        let dead = core.dead_hosts();
        if !dead.is_empty() {
            core.notify_dead(&dead);
            core.purge_dead_from_alive(&dead);
        }

        let endpoints: Vec<_> = data.neighbor.keys().cloned().collect();
        core.with_link_state(|ls: &mut LinkState| {
            ls.insert(data.source.clone(), data.neighbor.clone());
            for endpoint in endpoints {
                ls.entry(endpoint).or_default();
            }

            // The controller excludes itself from the disseminated graph, and purges
            // dead hosts at both levels, per SPEC_FULL.md §4.6.
            ls.remove(&core.hostname);
            for inner in ls.values_mut() {
                inner.remove(&core.hostname);
            }
            ls.retain(|host, _| !dead.contains(host));
            for inner in ls.values_mut() {
                inner.retain(|host, _| !dead.contains(host));
            }
        });
    }

    #[tracing::instrument(level = "debug", skip(self, core))]
    async fn on_tick(&self, core: &Arc<AlgorithmCore>) {
        let snapshot = core.link_state_snapshot();
        let now = core.now();
        let alive = core.alive_table_snapshot();

        let alive_hosts: Vec<Hostname> = alive
            .iter()
            .filter(|(_, last_seen)| now.saturating_sub(**last_seen) <= core.timeout.as_secs())
            .map(|(h, _)| h.clone())
            .collect();
        let dead_hosts = core.dead_hosts();
        if !dead_hosts.is_empty() {
            core.notify_dead(&dead_hosts);
            core.purge_dead_from_alive(&dead_hosts);
        }

        let payload = ControllerDbPayload {
            source: core.hostname.clone(),
            link: snapshot,
        };
        let body = serde_json::json!({ "type": "algorithm", "data": payload });

        for host in alive_hosts {
            if host == core.hostname {
                continue;
            }
            core.transport.send(&host, body.clone(), true).await;
        }
    }
}
