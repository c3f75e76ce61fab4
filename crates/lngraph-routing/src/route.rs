use lngraph_core::{MilliSatoshi, NodeId, ShortChannelId};
use serde::{Deserialize, Serialize};

/// One hop of a payment route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHop {
    /// Channel to forward over.
    pub channel_id: ShortChannelId,
    /// Node at the far end of the channel.
    pub node_id: NodeId,
    /// Amount delivered to `node_id`.
    pub amount: MilliSatoshi,
    /// CLTV value for the HTLC delivered to `node_id`.
    pub delay: u32,
}

/// A route from source to destination, consisting of an ordered list of hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    hops: Vec<RouteHop>,
}

impl Route {
    /// Create a route from hops ordered source to destination.
    pub fn new(hops: Vec<RouteHop>) -> Self {
        Self { hops }
    }

    /// The ordered hops.
    pub fn hops(&self) -> &[RouteHop] {
        &self.hops
    }

    pub fn into_hops(self) -> Vec<RouteHop> {
        self.hops
    }

    /// Number of hops in this route.
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Amount the sender puts on the first channel.
    pub fn amount_sent(&self) -> MilliSatoshi {
        self.hops.first().map_or(MilliSatoshi::ZERO, |h| h.amount)
    }

    /// Amount delivered to the destination.
    pub fn amount_delivered(&self) -> MilliSatoshi {
        self.hops.last().map_or(MilliSatoshi::ZERO, |h| h.amount)
    }

    /// Sum of the fees collected by intermediate nodes.
    pub fn total_fees(&self) -> MilliSatoshi {
        self.amount_sent()
            .checked_sub(self.amount_delivered())
            .unwrap_or(MilliSatoshi::ZERO)
    }

    /// CLTV of the first hop, the longest lock along the route.
    pub fn total_delay(&self) -> u32 {
        self.hops.first().map_or(0, |h| h.delay)
    }

    /// The destination node, if the route is not empty.
    pub fn destination(&self) -> Option<&NodeId> {
        self.hops.last().map(|h| &h.node_id)
    }
}
