//! Integration test: route finding over graphs built from gossip.

use lngraph_core::{MilliSatoshi, NodeId};
use lngraph_integration_tests::{node_id, random_node_id, scid, Policy, TestNetwork};
use lngraph_routing::{find_route, Route, RoutingError, RoutingState, MAX_HOPS};
use rand::Rng;

/// Check that each hop's amount covers the next hop's amount plus the fee
/// charged by the node in between.
fn assert_fee_conservation(state: &RoutingState, source: &NodeId, route: &Route) {
    let hops = route.hops();
    let mut from = *source;
    let mut edges = Vec::with_capacity(hops.len());
    for hop in hops {
        let edge = state
            .edge_between(hop.channel_id, &from, &hop.node_id)
            .expect("route uses an existing edge");
        assert!(edge.active);
        edges.push(edge);
        from = hop.node_id;
    }
    for i in 1..hops.len() {
        let fee = edges[i].fee_for(hops[i].amount);
        assert_eq!(hops[i - 1].amount, hops[i].amount.saturating_add(fee));
    }
}

// =========================================================================
// Documented scenarios
// =========================================================================

#[test]
fn test_single_channel_scenario() {
    let (p1, p2) = (node_id(1), node_id(2));
    let mut net = TestNetwork::new(p1);
    net.open_channel(1, &p1, &p2, Policy::new(1000, 1, 144));

    let final_delay = 9;
    let route = find_route(&net.state, &p1, &p2, MilliSatoshi(100_000), 0.0, final_delay).unwrap();

    assert_eq!(route.hop_count(), 1);
    let hop = &route.hops()[0];
    assert_eq!(hop.channel_id, scid(1));
    assert_eq!(hop.node_id, p2);
    assert_eq!(hop.amount, MilliSatoshi(100_000));
    assert_eq!(hop.delay, final_delay + 144);

    // The fee P1 would charge for forwarding over this edge.
    let edge = net.state.edge_between(scid(1), &p1, &p2).unwrap();
    assert_eq!(edge.fee_for(MilliSatoshi(100_000)), MilliSatoshi(1000));
}

#[test]
fn test_disabling_source_edges_blocks_all_routes() {
    let src = node_id(1);
    let mut net = TestNetwork::new(src);
    // Star around the source plus a ring among the leaves.
    for leaf in 2..=6u8 {
        net.open_channel(u64::from(leaf), &src, &node_id(leaf), Policy::default());
    }
    for leaf in 2..6u8 {
        net.open_channel(100 + u64::from(leaf), &node_id(leaf), &node_id(leaf + 1), Policy::default());
    }

    for leaf in 2..=6u8 {
        net.set_policy(u64::from(leaf), &src, &node_id(leaf), Policy::default().disabled());
    }

    for dest in 2..=6u8 {
        let err = find_route(&net.state, &src, &node_id(dest), MilliSatoshi(10_000), 0.0, 9)
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoRouteFound { .. }), "{}", err);
    }
}

#[test]
fn test_disconnected_components() {
    let mut net = TestNetwork::new(node_id(0));
    net.open_channel(1, &node_id(1), &node_id(2), Policy::default());
    net.open_channel(2, &node_id(2), &node_id(3), Policy::default());
    net.open_channel(3, &node_id(10), &node_id(11), Policy::default());

    for (from, to) in [(1, 10), (11, 3), (2, 11)] {
        let err = find_route(&net.state, &node_id(from), &node_id(to), MilliSatoshi(1), 0.0, 0)
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoRouteFound { .. }));
    }
}

// =========================================================================
// Hop ceiling
// =========================================================================

#[test]
fn test_paths_beyond_ceiling_are_unreachable() {
    let mut net = TestNetwork::new(node_id(0));
    let len = MAX_HOPS as u8 + 2;
    for i in 1..len {
        net.open_channel(u64::from(i), &node_id(i), &node_id(i + 1), Policy::new(1, 0, 1));
    }

    let at_ceiling = find_route(
        &net.state,
        &node_id(1),
        &node_id(MAX_HOPS as u8 + 1),
        MilliSatoshi(1_000),
        0.0,
        0,
    )
    .unwrap();
    assert_eq!(at_ceiling.hop_count(), MAX_HOPS);
    assert_fee_conservation(&net.state, &node_id(1), &at_ceiling);

    let err = find_route(
        &net.state,
        &node_id(1),
        &node_id(len),
        MilliSatoshi(1_000),
        0.0,
        0,
    )
    .unwrap_err();
    assert!(matches!(err, RoutingError::NoRouteFound { .. }));
}

#[test]
fn test_shortcut_within_ceiling_is_used() {
    let mut net = TestNetwork::new(node_id(0));
    let len = MAX_HOPS as u8 + 5;
    for i in 1..len {
        net.open_channel(u64::from(i), &node_id(i), &node_id(i + 1), Policy::new(1, 0, 1));
    }
    // An expensive shortcut brings the far end within reach.
    net.open_channel(500, &node_id(2), &node_id(20), Policy::new(5_000, 0, 40));

    let route =
        find_route(&net.state, &node_id(1), &node_id(len), MilliSatoshi(1_000), 0.0, 0).unwrap();
    assert!(route.hop_count() <= MAX_HOPS);
    assert!(route.hops().iter().any(|h| h.channel_id == scid(500)));
    assert_fee_conservation(&net.state, &node_id(1), &route);
}

// =========================================================================
// Random graphs
// =========================================================================

#[test]
fn test_random_graph_routes_are_consistent() {
    let mut rng = rand::thread_rng();
    let nodes: Vec<NodeId> = (0..30).map(|_| random_node_id(&mut rng)).collect();
    let mut net = TestNetwork::new(nodes[0]);

    let mut next_scid = 1u64;
    for i in 1..nodes.len() {
        // Spanning tree first, so everything is connected.
        let parent = rng.gen_range(0..i);
        let policy = Policy::new(rng.gen_range(0..2_000), rng.gen_range(0..5_000), rng.gen_range(6..200));
        net.open_channel(next_scid, &nodes[parent], &nodes[i], policy);
        next_scid += 1;
    }
    for _ in 0..40 {
        let a = rng.gen_range(0..nodes.len());
        let b = rng.gen_range(0..nodes.len());
        if a == b {
            continue;
        }
        let policy = Policy::new(rng.gen_range(0..2_000), rng.gen_range(0..5_000), rng.gen_range(6..200));
        net.open_channel(next_scid, &nodes[a], &nodes[b], policy);
        next_scid += 1;
    }

    let amount = MilliSatoshi(250_000);
    for dest in &nodes[1..] {
        let route = find_route(&net.state, &nodes[0], dest, amount, 0.000_01, 18).unwrap();
        assert!(route.hop_count() <= MAX_HOPS);
        assert_eq!(route.destination(), Some(dest));
        assert_eq!(route.amount_delivered(), amount);
        assert_fee_conservation(&net.state, &nodes[0], &route);

        let again = find_route(&net.state, &nodes[0], dest, amount, 0.000_01, 18).unwrap();
        assert_eq!(route, again);
    }
}

// =========================================================================
// Query validation
// =========================================================================

#[test]
fn test_query_errors() {
    let mut net = TestNetwork::new(node_id(0));
    net.open_channel(1, &node_id(1), &node_id(2), Policy::default());

    assert!(matches!(
        find_route(&net.state, &node_id(1), &node_id(1), MilliSatoshi(1), 0.0, 0),
        Err(RoutingError::RouteToSelf { .. })
    ));
    assert!(matches!(
        find_route(&net.state, &node_id(1), &node_id(50), MilliSatoshi(1), 0.0, 0),
        Err(RoutingError::UnknownParticipant { .. })
    ));
    assert!(matches!(
        find_route(&net.state, &node_id(1), &node_id(2), MilliSatoshi(u64::MAX), 0.0, 0),
        Err(RoutingError::AmountTooLarge { .. })
    ));

    let mut strict = Policy::default();
    strict.htlc_minimum_msat = 50_000;
    net.set_policy(1, &node_id(1), &node_id(2), strict);
    assert!(matches!(
        find_route(&net.state, &node_id(1), &node_id(2), MilliSatoshi(1_000), 0.0, 0),
        Err(RoutingError::AmountBelowMinimum { .. })
    ));
}
