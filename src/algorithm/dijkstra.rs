//! Dijkstra's algorithm over a live [`LinkState`] database (SPEC_FULL.md §4.4.1).
//!
//! Hand-rolled over `std::collections::BinaryHeap` rather than routed through a graph
//! crate: the pack's own link-state implementation
//! (`examples/nsg-ethz-bgpsim/bgpsim/src/ospf`) relaxes directly over an adjacency map
//! rather than through `petgraph`, which in that crate backs the topology/`RouterId`
//! graph, not the shortest-path loop itself (see DESIGN.md).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::types::{Cost, Hostname};

use super::LinkState;

/// One entry of the predecessor working set: the predecessor hostname (`None` for the
/// source, and for not-yet-reached hosts) and the best known cost so far. The `-1`
/// ("unreached") sentinel from SPEC_FULL.md §4.4.1 is represented as `cost: None`
/// rather than a numeric sentinel, to keep it out of [`Cost`]'s value space entirely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredecessorEntry {
    pub predecessor: Option<Hostname>,
    pub cost: Option<Cost>,
}

pub type PredecessorMap = HashMap<Hostname, PredecessorEntry>;

/// A min-heap entry ordered by `(cost, hostname)`, with ascending-hostname
/// tie-breaking made explicit via `Ord` so repeated runs over the same snapshot are
/// deterministic (SPEC_FULL.md §4.4.1 "must be deterministic for a given state
/// snapshot"). Wrapped in `Reverse` at the call site to turn `BinaryHeap`'s max-heap
/// into the min-heap Dijkstra needs.
#[derive(PartialEq, Eq)]
struct HeapEntry {
    cost: Cost,
    hostname: Hostname,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.hostname.cmp(&other.hostname))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes single-source shortest paths from `source` over `ls`, per SPEC_FULL.md
/// §4.4.1. Every hostname appearing anywhere in `ls` (as an outer key or as an inner
/// neighbor) is included in the result, reachable or not.
pub fn shortest_paths(ls: &LinkState, source: &Hostname) -> PredecessorMap {
    let mut pred: PredecessorMap = HashMap::new();
    for host in all_hosts(ls) {
        pred.insert(
            host,
            PredecessorEntry {
                predecessor: None,
                cost: None,
            },
        );
    }
    pred.insert(
        source.clone(),
        PredecessorEntry {
            predecessor: None,
            cost: Some(Cost::ZERO),
        },
    );

    let mut visited: HashSet<Hostname> = HashSet::new();
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
    heap.push(Reverse(HeapEntry {
        cost: Cost::ZERO,
        hostname: source.clone(),
    }));

    while let Some(Reverse(HeapEntry { hostname: w, cost: w_cost })) = heap.pop() {
        if visited.contains(&w) {
            continue;
        }
        // Stale heap entries (superseded by a cheaper relaxation) carry a higher cost
        // than what is currently recorded; skip them rather than re-visit with worse
        // information.
        if pred.get(&w).and_then(|e| e.cost) != Some(w_cost) {
            continue;
        }
        visited.insert(w.clone());

        if let Some(neighbors) = ls.get(&w) {
            for (x, edge_cost) in neighbors {
                if visited.contains(x) {
                    continue;
                }
                let candidate = w_cost.saturating_add(*edge_cost);
                if relax(&mut pred, x, &w, candidate) {
                    heap.push(Reverse(HeapEntry {
                        cost: candidate,
                        hostname: x.clone(),
                    }));
                }
            }
        }
    }

    pred
}

/// Relaxes the candidate `(via, candidate)` edge onto `to`, returning whether it
/// improved on the existing best cost. `to` is inserted into `pred` even if it has no
/// row of its own in `ls` (SPEC_FULL.md §3 "LinkState" note on empty inner maps for
/// never-heard-from hosts).
fn relax(pred: &mut PredecessorMap, to: &Hostname, via: &Hostname, candidate: Cost) -> bool {
    let entry = pred.entry(to.clone()).or_insert(PredecessorEntry {
        predecessor: None,
        cost: None,
    });
    let better = match entry.cost {
        None => true,
        Some(existing) => candidate < existing,
    };
    if better {
        entry.predecessor = Some(via.clone());
        entry.cost = Some(candidate);
    }
    better
}

fn all_hosts(ls: &LinkState) -> HashSet<Hostname> {
    let mut set = HashSet::new();
    for (host, neighbors) in ls {
        set.insert(host.clone());
        for n in neighbors.keys() {
            set.insert(n.clone());
        }
    }
    set
}

/// Derives a routing table from a predecessor map, per SPEC_FULL.md §4.4.1 "Routing
/// derivation from prev": walks predecessors back to the hop just before `source` for
/// each reachable destination; unreachable destinations are omitted; the self-entry is
/// re-asserted as `(source, 0)`.
pub fn derive_routing(pred: &PredecessorMap, source: &Hostname) -> super::RoutingTableSnapshot {
    let mut routing = super::RoutingTableSnapshot::new();
    routing.insert(
        source.clone(),
        crate::types::RoutingEntry::new(source.clone(), Cost::ZERO),
    );

    for (dest, entry) in pred {
        if dest == source {
            continue;
        }
        let Some(cost) = entry.cost else { continue };
        let Some(next_hop) = next_hop_towards(pred, dest, source) else {
            continue;
        };
        routing.insert(dest.clone(), crate::types::RoutingEntry::new(next_hop, cost));
    }

    routing
}

/// Walks the predecessor chain from `dest` back towards `source`, returning the hop
/// immediately preceding `source` (the next hop to use from `source`).
fn next_hop_towards(pred: &PredecessorMap, dest: &Hostname, source: &Hostname) -> Option<Hostname> {
    let mut current = dest.clone();
    loop {
        let entry = pred.get(&current)?;
        let predecessor = entry.predecessor.clone()?;
        if &predecessor == source {
            return Some(current);
        }
        current = predecessor;
    }
}
