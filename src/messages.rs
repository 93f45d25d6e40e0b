//! Wire payload schemas (SPEC_FULL.md §6). These are the bodies the dispatcher hands to
//! a component's `receive()` after stripping the top-level `{type, data}` envelope; the
//! envelope and the dispatch-by-tag itself are the transport/dispatcher's concern (out
//! of scope, see `transport.rs`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Cost, Hostname, WireCost};

/// Body of a `neighbor`-tagged message: a single wire cost update or removal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NeighborPayload {
    pub cost: WireCost,
}

/// One entry of a DV routing-table advertisement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DvRoutingEntryWire {
    pub next: Hostname,
    pub cost: Cost,
}

/// Body of an `algorithm` message for the DV protocol: a full routing-table exchange.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DvPayload {
    pub source: Hostname,
    pub routing: BTreeMap<Hostname, DvRoutingEntryWire>,
}

/// Body of an `algorithm` message for the LS protocol: a peer's local adjacency plus its
/// view of global liveness, flooded to every neighbor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LsFloodPayload {
    pub source: Hostname,
    pub neighbor: BTreeMap<Hostname, Cost>,
    /// Seconds-since-epoch last-seen timestamps, as floats on the wire per SPEC_FULL.md
    /// §6, decoded to [`crate::time::Timestamp`] at the boundary.
    pub alive: BTreeMap<Hostname, f64>,
}

/// Body of an `algorithm` message from a centralized member to its controller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberReportPayload {
    pub source: Hostname,
    pub neighbor: BTreeMap<Hostname, Cost>,
}

/// Body of an `algorithm` message from the controller disseminating the full
/// link-state database to a member.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerDbPayload {
    pub source: Hostname,
    pub link: BTreeMap<Hostname, BTreeMap<Hostname, Cost>>,
}
