//! The channel graph: participants and directional edges.
//!
//! Nodes refer to edges, and edges to nodes, by identity only. The store
//! resolves identities on demand, so there are no ownership cycles.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use lngraph_core::{
    get_channel_direction, ChainHash, Color, Direction, EdgeKey, MilliSatoshi, NetAddress,
    NodeAlias, NodeId, ShortChannelId,
};

use crate::broadcast::BroadcastSink;

/// A network participant.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Timestamp of the last accepted node announcement; `None` if never announced.
    pub last_timestamp: Option<u32>,
    pub addresses: Vec<NetAddress>,
    pub alias: NodeAlias,
    pub color: Color,
    /// Raw payload of the last accepted node announcement.
    pub announcement: Option<Bytes>,
    pub(crate) outbound: Vec<EdgeKey>,
    pub(crate) inbound: Vec<EdgeKey>,
}

impl Node {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            last_timestamp: None,
            addresses: Vec::new(),
            alias: NodeAlias::default(),
            color: Color::default(),
            announcement: None,
            outbound: Vec::new(),
            inbound: Vec::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Keys of edges leaving this node.
    pub fn outbound(&self) -> &[EdgeKey] {
        &self.outbound
    }

    /// Keys of edges arriving at this node.
    pub fn inbound(&self) -> &[EdgeKey] {
        &self.inbound
    }

    pub fn has_edges(&self) -> bool {
        !self.outbound.is_empty() || !self.inbound.is_empty()
    }
}

/// One direction of a channel, with the forwarding policy set by its source.
#[derive(Debug, Clone)]
pub struct Edge {
    pub key: EdgeKey,
    pub source: NodeId,
    pub destination: NodeId,
    /// Flat fee in millisatoshi.
    pub base_fee: u32,
    /// Fee in millionths of the forwarded amount.
    pub proportional_fee: u32,
    /// CLTV delta in blocks.
    pub delay: u16,
    pub active: bool,
    /// Timestamp of the last accepted update; `None` if never updated.
    pub last_timestamp: Option<u32>,
    pub htlc_minimum_msat: u64,
    /// Raw channel announcement payload.
    pub announcement: Bytes,
    /// Raw payload of the last accepted channel update.
    pub update: Option<Bytes>,
}

impl Edge {
    pub(crate) fn from_announcement(
        key: EdgeKey,
        source: NodeId,
        destination: NodeId,
        announcement: Bytes,
    ) -> Self {
        Self {
            key,
            source,
            destination,
            base_fee: 0,
            proportional_fee: 0,
            delay: 0,
            active: false,
            last_timestamp: None,
            htlc_minimum_msat: 0,
            announcement,
            update: None,
        }
    }

    pub fn short_channel_id(&self) -> ShortChannelId {
        self.key.short_channel_id
    }

    /// Fee charged by the source for forwarding `amount` over this edge.
    pub fn fee_for(&self, amount: MilliSatoshi) -> MilliSatoshi {
        let proportional =
            u128::from(self.proportional_fee) * u128::from(amount.value()) / 1_000_000;
        let fee = u128::from(self.base_fee) + proportional;
        MilliSatoshi(u64::try_from(fee).unwrap_or(u64::MAX))
    }
}

/// Owned view of the payment-channel graph for one chain.
///
/// Gossip handlers mutate it through `&mut self`; route queries only borrow it.
pub struct RoutingState {
    chain_hash: ChainHash,
    local_id: NodeId,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: HashMap<EdgeKey, Edge>,
    pub(crate) sink: Arc<dyn BroadcastSink>,
}

impl RoutingState {
    /// Create an empty graph bound to a chain and to this node's identity.
    pub fn new(chain_hash: ChainHash, local_id: NodeId, sink: Arc<dyn BroadcastSink>) -> Self {
        Self {
            chain_hash,
            local_id,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            sink,
        }
    }

    pub fn chain_hash(&self) -> &ChainHash {
        &self.chain_hash
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Existing record for `id`, or a fresh one inserted on the spot.
    pub fn get_or_create_node(&mut self, id: NodeId) -> &mut Node {
        self.nodes.entry(id).or_insert_with(|| Node::new(id))
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// The edge for a channel id and direction, if announced.
    pub fn lookup_edge(&self, short_channel_id: ShortChannelId, direction: Direction) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(short_channel_id, direction))
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// Both directions of a channel, ordered `(Zero, One)`.
    pub fn channel(&self, short_channel_id: ShortChannelId) -> Option<(&Edge, &Edge)> {
        Some((
            self.lookup_edge(short_channel_id, Direction::Zero)?,
            self.lookup_edge(short_channel_id, Direction::One)?,
        ))
    }

    /// Edge from `from` to `to` over the given channel, if both match.
    pub fn edge_between(
        &self,
        short_channel_id: ShortChannelId,
        from: &NodeId,
        to: &NodeId,
    ) -> Option<&Edge> {
        self.lookup_edge(short_channel_id, get_channel_direction(from, to))
            .filter(|e| e.source == *from && e.destination == *to)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Edges leaving `id`; empty if the node is unknown.
    pub fn outbound_edges<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.outbound.iter())
            .filter_map(move |k| self.edges.get(k))
    }

    /// Edges arriving at `id`; empty if the node is unknown.
    pub fn inbound_edges<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.inbound.iter())
            .filter_map(move |k| self.edges.get(k))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of channels; every channel contributes two edges.
    pub fn channel_count(&self) -> usize {
        self.edges
            .keys()
            .filter(|k| k.direction == Direction::Zero)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert the edge `from -> to` unless it already exists, linking it into
    /// both endpoints exactly once. Returns whether it was new.
    pub(crate) fn add_channel_direction(
        &mut self,
        key: EdgeKey,
        from: NodeId,
        to: NodeId,
        announcement: &Bytes,
    ) -> bool {
        if self.edges.contains_key(&key) {
            return false;
        }

        let source = self.get_or_create_node(from);
        if !source.outbound.contains(&key) {
            source.outbound.push(key);
        }
        let destination = self.get_or_create_node(to);
        if !destination.inbound.contains(&key) {
            destination.inbound.push(key);
        }

        self.edges.insert(
            key,
            Edge::from_announcement(key, from, to, announcement.clone()),
        );
        true
    }

    /// Remove one edge and unlink it from its endpoints.
    pub(crate) fn remove_edge(&mut self, key: &EdgeKey) -> Option<Edge> {
        let edge = self.edges.remove(key)?;
        if let Some(source) = self.nodes.get_mut(&edge.source) {
            source.outbound.retain(|k| k != key);
        }
        if let Some(destination) = self.nodes.get_mut(&edge.destination) {
            destination.inbound.retain(|k| k != key);
        }
        Some(edge)
    }
}

impl fmt::Debug for RoutingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingState")
            .field("chain_hash", &self.chain_hash)
            .field("local_id", &self.local_id)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}
