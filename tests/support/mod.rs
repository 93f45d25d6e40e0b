//! In-memory reference implementations of the SPEC_FULL.md §6 external collaborators
//! (transport, dispatcher, forwarding table, neighbor storage), following the teacher's
//! `DummyNetworkConnection` test-double pattern (`network_manager/network_connection.rs`):
//! a minimal implementation of the real trait boundary, with no actual socket I/O, so the
//! end-to-end scenarios in `tests/` can run many nodes in one process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use overlay_routing_core::algorithm::RoutingTableSnapshot;
use overlay_routing_core::transport::{Dispatcher, MessageHandler, NeighborStorage, Payload, RoutingModel, Transport};
use overlay_routing_core::{Cost, Hostname, RoutingEntry};

/// A shared hub routing payloads between every node registered on it, standing in for
/// the real addressed-unicast/broadcast transport (SPEC_FULL.md §6).
#[derive(Default)]
pub struct Network {
    dispatchers: Mutex<HashMap<Hostname, Arc<InMemoryDispatcher>>>,
}

impl Network {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, hostname: Hostname, dispatcher: Arc<InMemoryDispatcher>) {
        self.dispatchers.lock().insert(hostname, dispatcher);
    }

    async fn deliver(&self, to: &Hostname, from: Hostname, payload: Payload) {
        let dispatcher = self.dispatchers.lock().get(to).cloned();
        if let Some(dispatcher) = dispatcher {
            dispatcher.dispatch(from, payload).await;
        }
    }

    async fn deliver_broadcast(&self, from: &Hostname, payload: Payload) {
        let targets: Vec<Arc<InMemoryDispatcher>> = self
            .dispatchers
            .lock()
            .iter()
            .filter(|(host, _)| *host != from)
            .map(|(_, d)| d.clone())
            .collect();
        for dispatcher in targets {
            dispatcher.dispatch(from.clone(), payload.clone()).await;
        }
    }
}

/// Routes a decoded `{type, data}` envelope to the handler registered for its type tag,
/// mirroring the out-of-scope dispatcher described in SPEC_FULL.md §6.
#[derive(Default)]
pub struct InMemoryDispatcher {
    handlers: Mutex<HashMap<&'static str, Arc<dyn MessageHandler>>>,
}

impl InMemoryDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn dispatch(&self, source: Hostname, payload: Payload) {
        let Some(tag) = payload.get("type").and_then(|v| v.as_str()) else {
            return;
        };
        let handler = self.handlers.lock().get(tag).cloned();
        if let Some(handler) = handler {
            let data = payload.get("data").cloned().unwrap_or(Payload::Null);
            handler.receive(source, data).await;
        }
    }
}

impl Dispatcher for InMemoryDispatcher {
    fn register(&self, type_tag: &'static str, handler: Arc<dyn MessageHandler>) {
        self.handlers.lock().insert(type_tag, handler);
    }
}

/// A node's outbound half of the transport: knows its own hostname so deliveries can
/// carry a source, and the shared [`Network`] to deliver through.
pub struct InMemoryTransport {
    from: Hostname,
    network: Arc<Network>,
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport").field("from", &self.from).finish()
    }
}

impl InMemoryTransport {
    pub fn new(from: Hostname, network: Arc<Network>) -> Arc<Self> {
        Arc::new(Self { from, network })
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, hostname: &Hostname, payload: Payload, _is_new: bool) {
        self.network.deliver(hostname, self.from.clone(), payload).await;
    }

    async fn broadcast(&self, payload: Payload) {
        self.network.deliver_broadcast(&self.from, payload).await;
    }
}

/// Captures whatever the algorithm last published, for test assertions
/// (SPEC_FULL.md §6 `RoutingModel`).
#[derive(Debug, Default)]
pub struct InMemoryRoutingModel {
    table: Mutex<RoutingTableSnapshot>,
}

impl InMemoryRoutingModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> RoutingTableSnapshot {
        self.table.lock().clone()
    }
}

impl RoutingModel for InMemoryRoutingModel {
    fn update(&self, full_table: &RoutingTableSnapshot) {
        *self.table.lock() = full_table.clone();
    }

    fn update_one(&self, destination: &Hostname, next_hop: &Hostname, cost: Cost) {
        self.table
            .lock()
            .insert(destination.clone(), RoutingEntry::new(next_hop.clone(), cost));
    }
}

/// The direct-neighbor cost store `Neighbors` reads and mutates
/// (SPEC_FULL.md §6 `NeighborStorage`).
#[derive(Debug, Default)]
pub struct InMemoryNeighborStorage(Mutex<HashMap<Hostname, Cost>>);

impl InMemoryNeighborStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds a direct link without going through the retry/ack protocol, for scenario
    /// setup (the real traffic exercising `Neighbors::update` is covered separately).
    pub fn seed(&self, hostname: Hostname, cost: Cost) {
        self.0.lock().insert(hostname, cost);
    }
}

impl NeighborStorage for InMemoryNeighborStorage {
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
        self.0.lock().iter().map(|(h, c)| (h.clone(), *c)).collect()
    }
}

use std::time::Duration;

use overlay_routing_core::algorithm::{Algorithm, AlgorithmCore, Variant};
use overlay_routing_core::neighbors::Neighbors;
use overlay_routing_core::time::Clock;

/// Everything one test node needs: its algorithm handle (for `run_now`/`receive`
/// driving), and handles on its external collaborators for assertions and scenario
/// setup (direct-link seeding, routing-table snapshots).
pub struct Node<V: Variant> {
    pub hostname: Hostname,
    pub core: Arc<AlgorithmCore>,
    pub algorithm: Arc<Algorithm<V>>,
    pub neighbors: Neighbors,
    pub neighbor_storage: Arc<InMemoryNeighborStorage>,
    pub routing_model: Arc<InMemoryRoutingModel>,
}

/// Builds and registers one node on `network`, wired with an in-memory transport, its
/// own `Neighbors` (registered under the `neighbor` tag) and `variant` (registered
/// under the `algorithm` tag). `update_interval` is deliberately left to the caller:
/// scenario tests that want to control ticking explicitly via `algorithm.run_now()`
/// should pass a long interval so the periodic schedule never interferes.
pub fn build_node<V: Variant>(
    network: &Arc<Network>,
    hostname: &str,
    variant: V,
    update_interval: Duration,
    timeout: Duration,
    clock: Arc<dyn Clock>,
) -> Node<V> {
    let hostname = Hostname::from(hostname);
    let dispatcher = InMemoryDispatcher::new();
    network.register(hostname.clone(), dispatcher.clone());

    let transport: Arc<dyn Transport> = InMemoryTransport::new(hostname.clone(), network.clone());
    let neighbor_storage = InMemoryNeighborStorage::new();
    let neighbors = Neighbors::new_with_clock(
        transport.clone(),
        neighbor_storage.clone(),
        3,
        Duration::from_secs(10),
        clock.clone(),
    );
    neighbors.register(dispatcher.as_ref());

    let routing_model = InMemoryRoutingModel::new();
    let core = AlgorithmCore::new_with_clock(
        hostname.clone(),
        update_interval,
        timeout,
        neighbors.clone(),
        transport,
        routing_model.clone(),
        clock,
    );
    let algorithm = Arc::new(Algorithm::new(core.clone(), variant));
    algorithm.start(dispatcher.as_ref());

    Node {
        hostname,
        core,
        algorithm,
        neighbors,
        neighbor_storage,
        routing_model,
    }
}

/// Seeds a bidirectional direct link of `cost` between two already-built nodes, for
/// scenario setup that doesn't want to exercise `Neighbors::update`'s retry/ack path.
pub fn link<A: Variant, B: Variant>(a: &Node<A>, b: &Node<B>, cost: Cost) {
    a.neighbor_storage.seed(b.hostname.clone(), cost);
    b.neighbor_storage.seed(a.hostname.clone(), cost);
}
