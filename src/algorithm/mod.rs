//! The Algorithm core (SPEC_FULL.md §4.2): the lifecycle, tables, and tick scheduling
//! shared by DV, LS, and the two centralized variants.
//!
//! Generalized per SPEC_FULL.md §9's note: rather than a class hierarchy, one
//! `AlgorithmCore` owns the three locked tables and the tick task, and each protocol is
//! a small `Variant` implementation (`on_receive`/`on_tick`) driven by a generic
//! `Algorithm<V>` wrapper. This mirrors the `Inner`/`UnlockedInner` + background-task
//! wiring pattern in `routing_table/mod.rs`, generalized over the variant instead of
//! being specific to one protocol.

pub mod centralized;
pub mod dijkstra;
pub mod dv;
pub mod ls;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::neighbors::Neighbors;
use crate::time::{Clock, SystemClock, Timestamp};
use crate::transport::{Dispatcher, MessageHandler, Payload, RoutingModel, Transport};
use crate::types::{Cost, Hostname, RoutingEntry};

/// A destination-keyed routing table snapshot, as pushed to the external
/// [`RoutingModel`] (SPEC_FULL.md §3 `RoutingTable`).
pub type RoutingTableSnapshot = BTreeMap<Hostname, RoutingEntry>;

/// The two-level link-state database (SPEC_FULL.md §3 `LinkState`).
pub type LinkState = BTreeMap<Hostname, BTreeMap<Hostname, Cost>>;

/// Per-host last-seen timestamps (SPEC_FULL.md §3 `AliveTable`).
pub type AliveTable = HashMap<Hostname, Timestamp>;

/// A protocol-specific capability set plugged into [`AlgorithmCore`]'s shared
/// lifecycle. `on_receive` handles a decoded inbound `algorithm` payload; `on_tick`
/// implements the protocol's `run()` body (SPEC_FULL.md §4.3-§4.6).
#[async_trait]
pub trait Variant: Send + Sync + 'static {
    async fn on_receive(&self, core: &Arc<AlgorithmCore>, source: Hostname, payload: Payload);
    async fn on_tick(&self, core: &Arc<AlgorithmCore>);
}

/// Shared state and helpers common to every algorithm variant. Three independently
/// locked tables, per SPEC_FULL.md §5: `routing_table` is always acquired before
/// `link_state` when both are needed; `alive_table` is acquired alone, or as the
/// outermost of an `alive -> link_state` pair.
pub struct AlgorithmCore {
    pub hostname: Hostname,
    pub timeout: Duration,
    pub update_interval: Duration,
    routing_table: Mutex<RoutingTableSnapshot>,
    link_state: Mutex<LinkState>,
    alive_table: Mutex<AliveTable>,
    pub neighbors: Neighbors,
    pub transport: Arc<dyn Transport>,
    pub routing_model: Arc<dyn RoutingModel>,
    pub clock: Arc<dyn Clock>,
    /// Set once by `Algorithm::new` to run the variant's `on_tick` body immediately
    /// without disturbing the periodic schedule (SPEC_FULL.md §4.3 step 7, §9 "only the
    /// periodic path arms the timer").
    trigger: Mutex<Option<crate::tick_task::Routine>>,
}

impl AlgorithmCore {
    pub fn new(
        hostname: Hostname,
        update_interval: Duration,
        timeout: Duration,
        neighbors: Neighbors,
        transport: Arc<dyn Transport>,
        routing_model: Arc<dyn RoutingModel>,
    ) -> Arc<Self> {
        Self::new_with_clock(
            hostname,
            update_interval,
            timeout,
            neighbors,
            transport,
            routing_model,
            Arc::new(SystemClock),
        )
    }

    pub fn new_with_clock(
        hostname: Hostname,
        update_interval: Duration,
        timeout: Duration,
        neighbors: Neighbors,
        transport: Arc<dyn Transport>,
        routing_model: Arc<dyn RoutingModel>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let mut routing = BTreeMap::new();
        routing.insert(hostname.clone(), RoutingEntry::new(hostname.clone(), Cost::ZERO));
        let mut link_state = BTreeMap::new();
        link_state.insert(hostname.clone(), BTreeMap::new());
        let mut alive = HashMap::new();
        alive.insert(hostname.clone(), clock.now());

        Arc::new(Self {
            hostname,
            timeout,
            update_interval,
            routing_table: Mutex::new(routing),
            link_state: Mutex::new(link_state),
            alive_table: Mutex::new(alive),
            neighbors,
            transport,
            routing_model,
            clock,
            trigger: Mutex::new(None),
        })
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Registers the closure `Algorithm::new` uses to run a triggered update. Not part
    /// of the public API; called exactly once at construction.
    fn set_trigger(&self, routine: crate::tick_task::Routine) {
        *self.trigger.lock() = Some(routine);
    }

    /// Runs a triggered update (SPEC_FULL.md §4.3 step 7): fires the variant's
    /// `on_tick` body immediately, independent of the periodic schedule. A no-op if no
    /// trigger has been wired yet.
    pub async fn run_triggered_update(&self) {
        let routine = self.trigger.lock().clone();
        if let Some(routine) = routine {
            routine().await;
        }
    }

    /// Re-asserts the self-entry invariant `self -> (self, 0)` (SPEC_FULL.md §3, §8
    /// invariant 1). Called with the routing table lock already held.
    fn assert_self_entry(routing: &mut RoutingTableSnapshot, hostname: &Hostname) {
        routing.insert(
            hostname.clone(),
            RoutingEntry::new(hostname.clone(), Cost::ZERO),
        );
    }

    /// Runs `f` with the routing table locked, re-asserting the self-entry invariant
    /// afterwards, and returns `f`'s result.
    pub fn with_routing_table<T>(&self, f: impl FnOnce(&mut RoutingTableSnapshot) -> T) -> T {
        let mut routing = self.routing_table.lock();
        let result = f(&mut routing);
        Self::assert_self_entry(&mut routing, &self.hostname);
        result
    }

    pub fn routing_table_snapshot(&self) -> RoutingTableSnapshot {
        self.routing_table.lock().clone()
    }

    /// Runs `f` with the link-state database locked. Callers that also need the
    /// routing table must take it first (SPEC_FULL.md §5 lock ordering).
    pub fn with_link_state<T>(&self, f: impl FnOnce(&mut LinkState) -> T) -> T {
        let mut ls = self.link_state.lock();
        f(&mut ls)
    }

    pub fn link_state_snapshot(&self) -> LinkState {
        self.link_state.lock().clone()
    }

    /// Runs `f` with the alive table locked.
    pub fn with_alive_table<T>(&self, f: impl FnOnce(&mut AliveTable) -> T) -> T {
        let mut alive = self.alive_table.lock();
        f(&mut alive)
    }

    pub fn alive_table_snapshot(&self) -> AliveTable {
        self.alive_table.lock().clone()
    }

    /// Computes the current dead set against `timeout` (SPEC_FULL.md §3 `AliveTable`).
    pub fn dead_hosts(&self) -> HashSet<Hostname> {
        let now = self.now();
        self.alive_table
            .lock()
            .iter()
            .filter(|(_, last_seen)| now.saturating_sub(**last_seen) > self.timeout.as_secs())
            .map(|(h, _)| h.clone())
            .collect()
    }

    /// Publishes an independent snapshot of the routing table to the external
    /// [`RoutingModel`] (SPEC_FULL.md §4.2, §8 invariant 6: taken under lock, pushed
    /// after the lock is released).
    pub fn publish(&self) {
        let snapshot = self.routing_table_snapshot();
        self.routing_model.update(&snapshot);
    }

    /// Notifies Neighbors of every dead host by issuing a `delete` for each
    /// (SPEC_FULL.md §4.2 "on timeout-detection notify Neighbors"). Best-effort: the
    /// core does not await the outcome, mirroring the fire-and-forget framing of a
    /// purge that will be retried on the next tick regardless.
    pub fn notify_dead(&self, dead: &HashSet<Hostname>) {
        for host in dead {
            let neighbors = self.neighbors.clone();
            let host = host.clone();
            tokio::spawn(async move {
                neighbors
                    .delete(host, Box::new(|| {}), Box::new(|| {}))
                    .await;
            });
        }
    }

    /// Purges `dead` from a routing table, both as destinations and as next-hops. The
    /// return value only reflects purges among destinations (SPEC_FULL.md §4.3 step 3:
    /// "set `modified` if any purge occurred among destinations") — a row dropped
    /// solely because its next-hop died, with a live destination, does not itself
    /// count as a modification for triggered-update purposes.
    pub fn purge_dead_destinations(
        table: &mut RoutingTableSnapshot,
        dead: &HashSet<Hostname>,
    ) -> bool {
        let mut destination_purged = false;
        table.retain(|dest, entry| {
            if dead.contains(dest) {
                destination_purged = true;
                return false;
            }
            !dead.contains(&entry.next_hop)
        });
        destination_purged
    }

    /// Drops `dead` from the alive table so a purged host's liveness record does not
    /// linger after it has been purged everywhere else (SPEC_FULL.md §3, §8 scenario 2:
    /// `alive[C]` absent once `C` is dead).
    pub fn purge_dead_from_alive(&self, dead: &HashSet<Hostname>) {
        if dead.is_empty() {
            return;
        }
        self.with_alive_table(|alive| alive.retain(|host, _| !dead.contains(host)));
    }
}

/// Wires a [`Variant`] to the shared [`AlgorithmCore`] lifecycle: dispatcher
/// registration under the `algorithm` tag, the neighbor-update shortcut, and the
/// periodic tick (SPEC_FULL.md §4.2).
#[derive(Clone)]
pub struct Algorithm<V: Variant> {
    pub core: Arc<AlgorithmCore>,
    variant: Arc<V>,
    tick: crate::tick_task::TickTask,
}

impl<V: Variant> Algorithm<V> {
    pub fn new(core: Arc<AlgorithmCore>, variant: V) -> Self {
        let tick = crate::tick_task::TickTask::new(core.update_interval);
        let this = Self {
            core,
            variant: Arc::new(variant),
            tick,
        };
        this.subscribe_neighbor_updates();
        this.wire_tick_routine();
        this.wire_trigger();
        this
    }

    /// Wires the core's triggered-update hook to this algorithm's tick task, so a
    /// `Variant::on_receive` that only has `&Arc<AlgorithmCore>` can still force an
    /// immediate out-of-band run without re-arming the periodic schedule.
    fn wire_trigger(&self) {
        let tick = self.tick.clone();
        self.core
            .set_trigger(Arc::new(move || {
                let tick = tick.clone();
                Box::pin(async move { tick.run_now().await })
            }));
    }

    /// Subscribes to neighbor updates: a live cost change shortcuts a routing entry
    /// directly to `(h, cost)`; a removal (`None`) is ignored here since dead-host
    /// removal happens through the timeout path (SPEC_FULL.md §4.2). A live change also
    /// fires an out-of-band tick so peers learn of the new direct cost without waiting
    /// for the next periodic `run()` (SPEC_FULL.md §8 scenario 3).
    fn subscribe_neighbor_updates(&self) {
        let core = self.core.clone();
        let tick = self.tick.clone();
        self.core
            .neighbors
            .on_update(Arc::new(move |host, cost| {
                let Some(cost) = cost else { return };
                core.with_routing_table(|routing| {
                    routing.insert(host.clone(), RoutingEntry::new(host, cost));
                });
                core.publish();
                let tick = tick.clone();
                tokio::spawn(async move { tick.run_now().await });
            }));
    }

    /// Refreshes `alive[self]` before running the variant's tick body: local liveness
    /// is refreshed on every inbound message and every tick alike (SPEC_FULL.md §3),
    /// shared here so all four variants inherit it without repeating it in each
    /// `on_tick`.
    fn wire_tick_routine(&self) {
        let core = self.core.clone();
        let variant = self.variant.clone();
        self.tick.set_routine(move || {
            let core = core.clone();
            let variant = variant.clone();
            async move {
                let now = core.now();
                core.with_alive_table(|alive| {
                    alive.insert(core.hostname.clone(), now);
                });
                variant.on_tick(&core).await;
            }
        });
    }

    /// Registers this algorithm with the dispatcher under the `algorithm` tag
    /// (SPEC_FULL.md §4.2) and arms the periodic tick.
    pub fn start(self: &Arc<Self>, dispatcher: &dyn Dispatcher) {
        dispatcher.register("algorithm", self.clone() as Arc<dyn MessageHandler>);
        self.tick.spawn_periodic();
    }

    /// Cancels the outstanding periodic timer (SPEC_FULL.md §4.2 `stop()`).
    pub async fn stop(&self) {
        self.tick.stop().await;
    }

    /// Runs one `run()` tick immediately, without disturbing the periodic schedule.
    /// Used internally by triggered updates.
    pub async fn run_now(&self) {
        self.tick.run_now().await;
    }
}

#[async_trait]
impl<V: Variant> MessageHandler for Algorithm<V> {
    async fn receive(&self, source: Hostname, payload: Payload) {
        self.variant.on_receive(&self.core, source, payload).await;
    }
}
