//! Integration test: gossip ingestion into the graph store.
//!
//! Feeds announcement and update sequences through the handlers in
//! lngraph-routing and checks the resulting graph and broadcast queue.

use chrono::{TimeZone, Utc};
use lngraph_core::{Direction, GossipKind};
use lngraph_integration_tests::{
    channel_announcement, channel_update, node_announcement, node_id, random_node_id, scid,
    Policy, TestNetwork,
};
use lngraph_routing::{
    get_channel_direction, BroadcastTag, GossipError, UpdateOutcome, DEFAULT_PRUNE_AGE,
};

// =========================================================================
// Ordering between announcements and updates
// =========================================================================

#[test]
fn test_update_before_announcement_is_discarded() {
    let mut net = TestNetwork::new(node_id(0));
    let (a, b) = (node_id(1), node_id(2));

    let early = channel_update(scid(7), &a, &b, 5_000, Policy::new(77, 77, 77));
    let err = net.state.handle_channel_update(&early).unwrap_err();
    assert!(matches!(err, GossipError::UnknownChannel { .. }));

    net.announce(7, &a, &b);
    let edge = net
        .state
        .lookup_edge(scid(7), get_channel_direction(&a, &b))
        .unwrap();
    assert_eq!(edge.base_fee, 0);
    assert_eq!(edge.proportional_fee, 0);
    assert_eq!(edge.delay, 0);
    assert!(!edge.active);
    assert!(edge.last_timestamp.is_none());

    // Replaying the early update now applies it.
    assert_eq!(
        net.state.handle_channel_update(&early).unwrap(),
        UpdateOutcome::Applied
    );
}

#[test]
fn test_node_announcement_requires_channel() {
    let mut net = TestNetwork::new(node_id(0));
    let carol = node_id(3);

    let msg = node_announcement(&carol, 10, "carol");
    assert!(matches!(
        net.state.handle_node_announcement(&msg),
        Err(GossipError::UnknownNode { .. })
    ));

    net.open_channel(1, &carol, &node_id(4), Policy::default());
    assert!(net.state.handle_node_announcement(&msg).unwrap().is_applied());
    assert_eq!(net.state.node(&carol).unwrap().alias.to_string(), "carol");
}

// =========================================================================
// Idempotence and monotonicity
// =========================================================================

#[test]
fn test_reannouncement_changes_nothing() {
    let mut rng = rand::thread_rng();
    let mut net = TestNetwork::new(node_id(0));
    let nodes: Vec<_> = (0..12).map(|_| random_node_id(&mut rng)).collect();
    for (i, pair) in nodes.windows(2).enumerate() {
        net.announce(i as u64 + 1, &pair[0], &pair[1]);
    }

    let nodes_before = net.state.node_count();
    let edges_before = net.state.edge_count();
    let memberships = |net: &TestNetwork| -> Vec<(usize, usize)> {
        nodes
            .iter()
            .map(|id| {
                let n = net.state.node(id).unwrap();
                (n.outbound().len(), n.inbound().len())
            })
            .collect()
    };
    let lists_before = memberships(&net);
    let broadcasts_before = net.broadcasts.len();

    for (i, pair) in nodes.windows(2).enumerate() {
        let local = net
            .state
            .handle_channel_announcement(&channel_announcement(scid(i as u64 + 1), &pair[0], &pair[1]))
            .unwrap();
        assert!(!local);
    }

    assert_eq!(net.state.node_count(), nodes_before);
    assert_eq!(net.state.edge_count(), edges_before);
    assert_eq!(memberships(&net), lists_before);
    assert_eq!(net.broadcasts.len(), broadcasts_before);
}

#[test]
fn test_stale_updates_never_change_policy() {
    let mut net = TestNetwork::new(node_id(0));
    let (a, b) = (node_id(1), node_id(2));
    net.open_channel(1, &a, &b, Policy::new(1000, 1, 144));
    let current = net.now();

    for ts in [current - 1, current, 0] {
        let replay = channel_update(scid(1), &b, &a, ts, Policy::new(1, 2, 3).disabled());
        assert_eq!(
            net.state.handle_channel_update(&replay).unwrap(),
            UpdateOutcome::Stale
        );
    }

    let edge = net
        .state
        .lookup_edge(scid(1), get_channel_direction(&b, &a))
        .unwrap();
    assert_eq!(edge.base_fee, 1000);
    assert_eq!(edge.proportional_fee, 1);
    assert_eq!(edge.delay, 144);
    assert!(edge.active);
}

#[test]
fn test_directions_are_independent() {
    let mut net = TestNetwork::new(node_id(0));
    let (a, b) = (node_id(1), node_id(2));
    net.announce(1, &a, &b);
    net.set_policy(1, &a, &b, Policy::new(10, 0, 6));
    net.set_policy(1, &b, &a, Policy::new(20, 0, 12).disabled());

    let forward = net.state.lookup_edge(scid(1), Direction::Zero).unwrap();
    let backward = net.state.lookup_edge(scid(1), Direction::One).unwrap();
    assert_eq!(forward.source, a);
    assert_eq!(forward.base_fee, 10);
    assert!(forward.active);
    assert_eq!(backward.source, b);
    assert_eq!(backward.base_fee, 20);
    assert!(!backward.active);
    assert!(backward.last_timestamp > forward.last_timestamp);
}

// =========================================================================
// Broadcast hand-off
// =========================================================================

#[test]
fn test_broadcast_queue_keeps_newest_payloads() {
    let mut net = TestNetwork::new(node_id(0));
    let (a, b) = (node_id(1), node_id(2));
    net.open_channel(1, &a, &b, Policy::default());
    net.set_policy(1, &a, &b, Policy::new(5, 5, 5));
    net.state
        .handle_node_announcement(&node_announcement(&a, 1, "alice"))
        .unwrap();

    // One announcement, one update per direction and one node announcement.
    assert_eq!(net.broadcasts.len(), 4);

    let key = net.state.edge_between(scid(1), &a, &b).unwrap().key;
    let entry = net
        .broadcasts
        .get(GossipKind::ChannelUpdate, &BroadcastTag::Update(key))
        .unwrap();
    assert_eq!(entry.timestamp, net.now());

    let mut cursor = 0;
    let mut last_kind = None;
    while let Some(entry) = net.broadcasts.next_after(cursor) {
        cursor = entry.index;
        last_kind = Some(entry.kind);
    }
    assert_eq!(last_kind, Some(GossipKind::NodeAnnouncement));
}

#[test]
fn test_foreign_chain_gossip_is_ignored() {
    let mut net = TestNetwork::new(node_id(0));
    let mut msg = channel_announcement(scid(1), &node_id(1), &node_id(2));
    msg.chain_hash = lngraph_core::ChainHash::BITCOIN;

    let err = net.state.handle_channel_announcement(&msg).unwrap_err();
    assert!(err.is_benign());
    assert!(net.state.is_empty());
    assert!(net.broadcasts.is_empty());
}

#[test]
fn test_local_channel_signals_self_announcement() {
    let me = node_id(9);
    let mut net = TestNetwork::new(me);
    let msg = channel_announcement(scid(3), &node_id(1), &me);
    assert!(net.state.handle_channel_announcement(&msg).unwrap());

    let other = channel_announcement(scid(4), &node_id(1), &node_id(2));
    assert!(!net.state.handle_channel_announcement(&other).unwrap());
}

// =========================================================================
// Pruning
// =========================================================================

#[test]
fn test_prune_then_reannounce() {
    let mut net = TestNetwork::new(node_id(0));
    let (a, b, c) = (node_id(1), node_id(2), node_id(3));
    net.open_channel(1, &a, &b, Policy::default());
    net.open_channel(2, &b, &c, Policy::default());

    // Only channel 2 is refreshed close to "now".
    let now = 2_000_000u32;
    net.state
        .handle_channel_update(&channel_update(scid(2), &b, &c, now - 60, Policy::default()))
        .unwrap();

    let stats = net
        .state
        .prune_stale(Utc.timestamp_opt(i64::from(now), 0).unwrap(), DEFAULT_PRUNE_AGE);
    assert_eq!(stats.channels_removed, vec![scid(1)]);
    assert_eq!(stats.nodes_removed, vec![a]);
    assert!(net.state.lookup_edge(scid(1), Direction::Zero).is_none());
    let announced = BroadcastTag::Channel(scid(1));
    assert!(net
        .broadcasts
        .get(GossipKind::ChannelAnnouncement, &announced)
        .is_none());

    // Updates for the pruned channel are unknown again until it is re-announced.
    let late = channel_update(scid(1), &a, &b, now, Policy::default());
    assert!(matches!(
        net.state.handle_channel_update(&late),
        Err(GossipError::UnknownChannel { .. })
    ));
    net.announce(1, &a, &b);
    assert!(net
        .broadcasts
        .get(GossipKind::ChannelAnnouncement, &announced)
        .is_some());
    assert!(net.state.handle_channel_update(&late).unwrap().is_applied());
}
