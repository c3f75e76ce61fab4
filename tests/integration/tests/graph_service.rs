//! Integration test: the async graph service from lngraph-node driving the
//! routing crate, with configuration loaded from TOML.

use std::sync::Arc;

use lngraph_core::{GossipMessage, MilliSatoshi};
use lngraph_integration_tests::{
    channel_announcement, channel_update, node_announcement, node_id, scid, Policy,
};
use lngraph_node::{GraphConfig, GraphEvent, GraphService, NodeError};
use lngraph_routing::{BroadcastStore, RoutingError};

fn regtest_config(local: u8) -> GraphConfig {
    let toml_str = format!(
        r#"
[chain]
network = "regtest"

[node]
local_id = "{}"

[routing]
final_cltv = 18

[pruning]
enabled = false
"#,
        node_id(local)
    );
    toml::from_str(&toml_str).expect("parse config")
}

/// Gossip for a line 1 - 2 - 3 - 4, with updates arriving first.
fn line_gossip() -> Vec<GossipMessage> {
    let mut msgs: Vec<GossipMessage> = Vec::new();
    for i in 1..4u8 {
        let (a, b) = (node_id(i), node_id(i + 1));
        msgs.push(channel_update(scid(u64::from(i)), &a, &b, 1, Policy::new(100, 100, 10)).into());
        msgs.push(channel_announcement(scid(u64::from(i)), &a, &b).into());
        msgs.push(channel_update(scid(u64::from(i)), &a, &b, 2, Policy::new(100, 100, 10)).into());
        msgs.push(channel_update(scid(u64::from(i)), &b, &a, 2, Policy::new(100, 100, 10)).into());
    }
    msgs.push(node_announcement(&node_id(4), 1, "dave").into());
    msgs
}

#[tokio::test]
async fn test_service_ingests_and_routes() {
    let broadcasts = Arc::new(BroadcastStore::new());
    let service = GraphService::spawn(&regtest_config(1), broadcasts.clone()).unwrap();
    let mut events = service.subscribe();

    for msg in line_gossip() {
        service.submit(msg).await.unwrap();
    }
    service.flush().await.unwrap();

    let stats = service.stats();
    assert_eq!(stats.discarded, 3);
    assert_eq!(stats.applied, 10);

    // Channel 1 touches the local node.
    assert_eq!(
        events.recv().await.unwrap(),
        GraphEvent::LocalChannelAnnounced(scid(1))
    );

    let route = service
        .find_route(&node_id(1), &node_id(4), MilliSatoshi(1_000_000))
        .await
        .unwrap();
    assert_eq!(route.hop_count(), 3);
    assert_eq!(route.amount_delivered(), MilliSatoshi(1_000_000));
    // Nodes 2 and 3 each charge 100 + 100ppm on what they forward.
    assert_eq!(route.hops()[1].amount, MilliSatoshi(1_000_200));
    assert_eq!(route.hops()[0].amount, MilliSatoshi(1_000_400));
    assert_eq!(route.total_delay(), 18 + 30);

    {
        let graph = service.read().await;
        assert_eq!(graph.channel_count(), 3);
        assert_eq!(graph.node(&node_id(4)).unwrap().alias.to_string(), "dave");
    }
    // 3 announcements, 6 updates, 1 node announcement.
    assert_eq!(broadcasts.len(), 10);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_service_reports_unreachable_destination() {
    let service = GraphService::spawn(&regtest_config(1), Arc::new(BroadcastStore::new())).unwrap();
    service
        .submit(channel_announcement(scid(1), &node_id(1), &node_id(2)))
        .await
        .unwrap();
    service
        .submit(channel_announcement(scid(2), &node_id(3), &node_id(4)))
        .await
        .unwrap();
    for (id, a, b) in [(1, 1, 2), (2, 3, 4)] {
        service
            .submit(channel_update(scid(id), &node_id(a), &node_id(b), 1, Policy::default()))
            .await
            .unwrap();
    }
    service.flush().await.unwrap();

    let err = service
        .find_route(&node_id(1), &node_id(4), MilliSatoshi(1_000))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NodeError::Routing(RoutingError::NoRouteFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_queries_see_consistent_graph() {
    let service = Arc::new(
        GraphService::spawn(&regtest_config(0), Arc::new(BroadcastStore::new())).unwrap(),
    );
    for msg in line_gossip() {
        service.submit(msg).await.unwrap();
    }
    service.flush().await.unwrap();

    let writer = {
        let service = service.clone();
        tokio::spawn(async move {
            for i in 10..60u8 {
                let (a, b) = (node_id(i), node_id(i + 1));
                service
                    .submit(channel_announcement(scid(u64::from(i)), &a, &b))
                    .await
                    .unwrap();
                service
                    .submit(channel_update(scid(u64::from(i)), &a, &b, 1, Policy::default()))
                    .await
                    .unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        readers.push(tokio::spawn(async move {
            service
                .find_route(&node_id(1), &node_id(4), MilliSatoshi(1_000_000))
                .await
        }));
    }

    for reader in readers {
        let route = reader.await.unwrap().unwrap();
        assert_eq!(route.hops()[0].amount, MilliSatoshi(1_000_400));
    }
    writer.await.unwrap();
    service.flush().await.unwrap();
    assert_eq!(service.read().await.channel_count(), 53);
}
