//! The centralized member (SPEC_FULL.md §4.5): specializes LS but does not flood;
//! instead it reports its own adjacency to a configured controller hostname and applies
//! whatever full link-state database the controller last sent.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::messages::{ControllerDbPayload, MemberReportPayload};
use crate::transport::Payload;
use crate::types::{Hostname, RoutingEntry};

use super::super::ls::Ls;
use super::super::{AlgorithmCore, LinkState, Variant};

/// The centralized-member [`Variant`]. Holds the controller's hostname, the one piece
/// of state LS/DV/Controller don't need.
pub struct Member {
    pub controller: Hostname,
}

impl Member {
    pub fn new(controller: Hostname) -> Self {
        Self { controller }
    }

    /// Force-inserts `routing[controller] = (controller, cost)` using the direct
    /// neighbor cost to the controller, so the controller is always reachable even if
    /// the Dijkstra-derived path disagrees (SPEC_FULL.md §4.5). Returns
    /// `Err(ControllerUnreachable)` without mutating anything if the controller is not
    /// currently a direct neighbor — never fabricates a cost (SPEC_FULL.md §9 open
    /// question decision).
    fn force_insert_controller_route(
        &self,
        core: &Arc<AlgorithmCore>,
    ) -> Result<(), CoreError> {
        let cost = core
            .neighbors
            .get()
            .into_iter()
            .find(|(h, _)| h == &self.controller)
            .map(|(_, c)| c)
            .ok_or_else(|| CoreError::ControllerUnreachable {
                controller: self.controller.clone(),
            })?;

        core.with_routing_table(|routing| {
            routing.insert(
                self.controller.clone(),
                RoutingEntry::new(self.controller.clone(), cost),
            );
        });
        Ok(())
    }
}

#[async_trait]
impl Variant for Member {
    #[tracing::instrument(level = "debug", skip(self, core, payload))]
    async fn on_receive(&self, core: &Arc<AlgorithmCore>, source: Hostname, payload: Payload) {
        let data: ControllerDbPayload = match serde_json::from_value(payload) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%source, error = %err, "dropping malformed controller DB");
                return;
            }
        };

        core.with_link_state(|ls: &mut LinkState| {
            *ls = data.link;
        });

        Ls::recompute_and_publish(core);

        if let Err(err) = self.force_insert_controller_route(core) {
            tracing::warn!(error = %err, "skipping forced controller route");
        }
        core.publish();
    }

    #[tracing::instrument(level = "debug", skip(self, core))]
    async fn on_tick(&self, core: &Arc<AlgorithmCore>) {
        let neighbor: std::collections::BTreeMap<_, _> = core.neighbors.get().into_iter().collect();
        let payload = MemberReportPayload {
            source: core.hostname.clone(),
            neighbor,
        };
        let body = serde_json::json!({ "type": "algorithm", "data": payload });
        core.transport.send(&self.controller, body, true).await;
    }
}
