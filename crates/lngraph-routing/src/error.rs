use lngraph_core::{ChainHash, Direction, GossipKind, MilliSatoshi, NodeId, ShortChannelId};

/// Reasons a gossip message was not applied to the graph.
#[derive(Debug, thiserror::Error)]
pub enum GossipError {
    #[error("{kind} for foreign chain {received} (expected {expected})")]
    ChainMismatch {
        kind: GossipKind,
        expected: ChainHash,
        received: ChainHash,
    },

    #[error("channel update for unknown channel {short_channel_id} direction {direction}")]
    UnknownChannel {
        short_channel_id: ShortChannelId,
        direction: Direction,
    },

    #[error("node announcement for unknown node {node_id}")]
    UnknownNode { node_id: NodeId },

    #[error("conflicting announcement for channel {short_channel_id}: endpoints differ from known channel")]
    ConflictingAnnouncement { short_channel_id: ShortChannelId },

    #[error("malformed {kind}: {reason}")]
    MalformedInput { kind: GossipKind, reason: String },
}

impl GossipError {
    /// True for conditions expected under normal gossip flooding and
    /// reordering, as opposed to peers sending inconsistent data.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            GossipError::ChainMismatch { .. }
                | GossipError::UnknownChannel { .. }
                | GossipError::UnknownNode { .. }
        )
    }
}

/// Errors that can occur while computing a route.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("no route found from {from} to {to}")]
    NoRouteFound { from: NodeId, to: NodeId },

    #[error("unknown participant: {node_id}")]
    UnknownParticipant { node_id: NodeId },

    #[error("refusing to route from {node_id} to itself")]
    RouteToSelf { node_id: NodeId },

    #[error("amount too large: {amount} (max {max})")]
    AmountTooLarge {
        amount: MilliSatoshi,
        max: MilliSatoshi,
    },

    #[error("amount {amount} is below a channel minimum on every path from {from} to {to}")]
    AmountBelowMinimum {
        from: NodeId,
        to: NodeId,
        amount: MilliSatoshi,
    },

    #[error("invalid risk factor: {risk_factor}")]
    InvalidRiskFactor { risk_factor: f64 },

    #[error("maximum hop count exceeded: {max_hops} (ceiling {ceiling})")]
    MaxHopsExceeded { max_hops: usize, ceiling: usize },
}
