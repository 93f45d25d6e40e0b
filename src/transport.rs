//! External collaborators (SPEC_FULL.md §6). These are declared as traits only: the
//! wire transport, the dispatcher, the forwarding-table consumer, and the neighbor
//! storage are all out of scope for this crate (§1). An in-memory reference
//! implementation used by the test harness lives under `tests/support/`, mirroring the
//! teacher's `DummyNetworkConnection` test double in `network_manager/network_connection.rs`.

use std::fmt;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{Cost, Hostname};

/// An outbound, opaque, best-effort payload. The transport does not interpret this; it
/// only needs to serialize and deliver it. In practice this is the JSON-encoded
/// `{type, data}` envelope built from one of the `messages` structs.
pub type Payload = serde_json::Value;

/// Best-effort unicast/broadcast delivery (SPEC_FULL.md §6). Implementations may drop,
/// reorder, or delay payloads; the core layers its own reliability (Neighbors'
/// retry/ack, the algorithms' periodic re-broadcast) on top.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `payload` to `hostname`. `is_new` distinguishes a fresh attempt from a
    /// retry, matching the `send(hostname, payload, new=true)` signature in §6; most
    /// transports can ignore it.
    async fn send(&self, hostname: &Hostname, payload: Payload, is_new: bool);

    /// Delivers `payload` to every currently-reachable host.
    async fn broadcast(&self, payload: Payload);
}

/// Registers a component's `receive` under a wire type tag (SPEC_FULL.md §6). The core
/// does not implement a dispatcher; this trait exists so `Neighbors`/`Algorithm` can be
/// registered against one without this crate owning the registry.
pub trait Dispatcher: Send + Sync {
    fn register(&self, type_tag: &'static str, handler: std::sync::Arc<dyn MessageHandler>);
}

/// A component that can accept a decoded inbound payload from a given source.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn receive(&self, source: Hostname, payload: Payload);
}

/// The external forwarding/routing table the algorithms push snapshots into
/// (SPEC_FULL.md §6).
pub trait RoutingModel: Send + Sync + fmt::Debug {
    fn update(&self, full_table: &crate::algorithm::RoutingTableSnapshot);
    fn update_one(&self, destination: &Hostname, next_hop: &Hostname, cost: Cost);
}

/// The external neighbor-cost store `Neighbors` reads and mutates (SPEC_FULL.md §6).
pub trait NeighborStorage: Send + Sync + fmt::Debug {
    fn get_cost(&self, hostname: &Hostname) -> Option<Cost>;
    fn update(&self, hostname: Hostname, cost: Cost);
    fn remove(&self, hostname: &Hostname);
    fn enumerate(&self) -> Vec<(Hostname, Cost)>;
}

/// A no-op error conversion helper used at the handler boundary to turn a validation
/// failure into the documented "log and drop" disposition (SPEC_FULL.md §7) rather than
/// propagating it through the dispatcher, which has no error channel.
pub fn log_and_drop(context: &str, err: CoreError) {
    tracing::warn!(context, error = %err, "dropping malformed payload");
}
