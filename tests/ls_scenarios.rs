//! End-to-end link-state scenario (SPEC_FULL.md §8 scenario 2: link death).

mod support;

use std::sync::Arc;
use std::time::Duration;

use overlay_routing_core::algorithm::ls::Ls;
use overlay_routing_core::time::FakeClock;
use overlay_routing_core::types::{Cost, Hostname};

use support::{build_node, link, Network};

const NO_PERIODIC: Duration = Duration::from_secs(3600);
const TIMEOUT: Duration = Duration::from_secs(180);

#[tokio::test]
async fn dead_peer_is_purged_from_routing_and_link_state() {
    let network = Network::new();
    let clock = Arc::new(FakeClock::new(0));

    let a = build_node(&network, "A", Ls, NO_PERIODIC, TIMEOUT, clock.clone());
    let b = build_node(&network, "B", Ls, NO_PERIODIC, TIMEOUT, clock.clone());
    let c = build_node(&network, "C", Ls, NO_PERIODIC, TIMEOUT, clock.clone());

    link(&a, &b, Cost(1));
    link(&b, &c, Cost(1));
    link(&a, &c, Cost(5));

    for _ in 0..3 {
        a.algorithm.run_now().await;
        b.algorithm.run_now().await;
        c.algorithm.run_now().await;
    }

    // Converged: A reaches C via B at cost 2, cheaper than the direct 5-cost link.
    let a_routing = a.routing_model.snapshot();
    let c_entry = a_routing.get(&Hostname::from("C")).expect("A knows C");
    assert_eq!(c_entry.next_hop, Hostname::from("B"));
    assert_eq!(c_entry.cost, Cost(2));

    // C stops heartbeating; A and B keep flooding each other past the timeout.
    clock.advance(TIMEOUT.as_secs() + 1);
    a.algorithm.run_now().await;
    b.algorithm.run_now().await;

    let a_routing = a.routing_model.snapshot();
    assert!(!a_routing.contains_key(&Hostname::from("C")));
    assert!(a_routing
        .values()
        .all(|entry| entry.next_hop != Hostname::from("C")));

    let b_routing = b.routing_model.snapshot();
    assert!(!b_routing.contains_key(&Hostname::from("C")));

    let a_alive = a.core.alive_table_snapshot();
    assert!(!a_alive.contains_key(&Hostname::from("C")));

    let a_ls = a.core.link_state_snapshot();
    assert!(!a_ls.contains_key(&Hostname::from("C")));
    assert!(!a_ls[&Hostname::from("A")].contains_key(&Hostname::from("C")));
}
