use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lngraph_core::{Direction, EdgeKey, GossipKind, NodeId, ShortChannelId};

use crate::broadcast::BroadcastTag;
use crate::graph::RoutingState;

/// Channels not refreshed by an update for this long are considered closed.
pub const DEFAULT_PRUNE_AGE: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// What a pruning pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub channels_removed: Vec<ShortChannelId>,
    pub nodes_removed: Vec<NodeId>,
}

impl PruneStats {
    pub fn is_empty(&self) -> bool {
        self.channels_removed.is_empty() && self.nodes_removed.is_empty()
    }
}

impl RoutingState {
    /// Remove channels whose newest update is older than `max_age` relative
    /// to `now`, together with nodes left without any channel. Their
    /// payloads are withdrawn from the broadcast sink.
    ///
    /// Both directions of a channel go together. A channel that never
    /// received an update counts as updated at time zero.
    pub fn prune_stale(&mut self, now: DateTime<Utc>, max_age: Duration) -> PruneStats {
        let now_secs = u32::try_from(now.timestamp().max(0)).unwrap_or(u32::MAX);
        let max_age_secs = u32::try_from(max_age.as_secs()).unwrap_or(u32::MAX);
        let cutoff = now_secs.saturating_sub(max_age_secs);

        let stale: BTreeSet<ShortChannelId> = self
            .edges
            .keys()
            .map(|k| k.short_channel_id)
            .filter(|scid| self.newest_update(*scid) < cutoff)
            .collect();

        let mut stats = PruneStats::default();
        let mut touched: BTreeSet<NodeId> = BTreeSet::new();

        for scid in stale {
            for direction in [Direction::Zero, Direction::One] {
                let key = EdgeKey::new(scid, direction);
                if let Some(edge) = self.remove_edge(&key) {
                    touched.insert(edge.source);
                    touched.insert(edge.destination);
                }
                self.sink
                    .forget(GossipKind::ChannelUpdate, BroadcastTag::Update(key));
            }
            self.sink
                .forget(GossipKind::ChannelAnnouncement, BroadcastTag::Channel(scid));
            stats.channels_removed.push(scid);
        }

        for id in touched {
            if self.nodes.get(&id).map_or(false, |n| !n.has_edges()) {
                self.nodes.remove(&id);
                self.sink
                    .forget(GossipKind::NodeAnnouncement, BroadcastTag::Node(id));
                stats.nodes_removed.push(id);
            }
        }

        if !stats.is_empty() {
            tracing::info!(
                channels = stats.channels_removed.len(),
                nodes = stats.nodes_removed.len(),
                cutoff,
                "pruned stale channels"
            );
        }
        stats
    }

    fn newest_update(&self, scid: ShortChannelId) -> u32 {
        [Direction::Zero, Direction::One]
            .iter()
            .filter_map(|d| self.edges.get(&EdgeKey::new(scid, *d)))
            .filter_map(|e| e.last_timestamp)
            .max()
            .unwrap_or(0)
    }
}
