//! Gossip handlers: translate decoded gossip into graph mutations.
//!
//! Every handler validates before it mutates, so a rejected message leaves
//! the graph exactly as it was.

use lngraph_core::{
    get_channel_direction, ChainHash, ChannelAnnouncement, ChannelUpdate, EdgeKey, GossipKind,
    GossipMessage, NodeAnnouncement,
};

use crate::broadcast::BroadcastTag;
use crate::error::GossipError;
use crate::graph::RoutingState;

/// Result of a timestamp-gated update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The message was newer than the stored state and replaced it.
    Applied,
    /// The message was not newer than the stored state and was dropped.
    Stale,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// Result of [`RoutingState::handle_gossip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GossipOutcome {
    /// A channel announcement was processed; `local` as returned by
    /// [`RoutingState::handle_channel_announcement`].
    Channel { local: bool },
    ChannelUpdate(UpdateOutcome),
    NodeUpdate(UpdateOutcome),
}

impl RoutingState {
    /// Add a channel's two directional edges to the graph.
    ///
    /// Returns `true` when the channel was not known before and one of its
    /// endpoints is the local node, meaning the local node has just become
    /// part of the public graph and may announce itself.
    pub fn handle_channel_announcement(
        &mut self,
        msg: &ChannelAnnouncement,
    ) -> Result<bool, GossipError> {
        self.check_chain(GossipKind::ChannelAnnouncement, &msg.chain_hash)?;

        let scid = msg.short_channel_id;
        if msg.node_id_1 == msg.node_id_2 {
            return Err(GossipError::MalformedInput {
                kind: GossipKind::ChannelAnnouncement,
                reason: format!("channel {} has identical endpoints", scid),
            });
        }

        let forward = EdgeKey::new(scid, get_channel_direction(&msg.node_id_1, &msg.node_id_2));
        let backward = forward.reverse();

        for (key, source, destination) in [
            (forward, &msg.node_id_1, &msg.node_id_2),
            (backward, &msg.node_id_2, &msg.node_id_1),
        ] {
            if let Some(existing) = self.edges.get(&key) {
                if existing.source != *source || existing.destination != *destination {
                    tracing::debug!(
                        scid = %scid,
                        known_source = %existing.source,
                        announced_source = %source,
                        "rejecting conflicting channel announcement"
                    );
                    return Err(GossipError::ConflictingAnnouncement {
                        short_channel_id: scid,
                    });
                }
            }
        }

        let added_forward =
            self.add_channel_direction(forward, msg.node_id_1, msg.node_id_2, &msg.raw);
        let added_backward =
            self.add_channel_direction(backward, msg.node_id_2, msg.node_id_1, &msg.raw);

        if !added_forward && !added_backward {
            tracing::trace!(scid = %scid, "channel already known");
            return Ok(false);
        }

        self.sink.store_for_rebroadcast(
            GossipKind::ChannelAnnouncement,
            BroadcastTag::Channel(scid),
            0,
            msg.raw.clone(),
        );

        let local = msg.node_id_1 == *self.local_id() || msg.node_id_2 == *self.local_id();
        tracing::debug!(
            scid = %scid,
            node_1 = %msg.node_id_1,
            node_2 = %msg.node_id_2,
            local,
            "added channel"
        );
        Ok(local)
    }

    /// Apply a channel update to the edge selected by its direction bit.
    pub fn handle_channel_update(
        &mut self,
        msg: &ChannelUpdate,
    ) -> Result<UpdateOutcome, GossipError> {
        self.check_chain(GossipKind::ChannelUpdate, &msg.chain_hash)?;

        let key = EdgeKey::new(msg.short_channel_id, msg.direction());
        let Some(edge) = self.edges.get_mut(&key) else {
            tracing::debug!(edge = %key, "ignoring update for unknown channel");
            return Err(GossipError::UnknownChannel {
                short_channel_id: key.short_channel_id,
                direction: key.direction,
            });
        };

        if let Some(last) = edge.last_timestamp {
            if last >= msg.timestamp {
                tracing::debug!(
                    edge = %key,
                    last_timestamp = last,
                    timestamp = msg.timestamp,
                    "ignoring outdated update"
                );
                return Ok(UpdateOutcome::Stale);
            }
        }

        edge.last_timestamp = Some(msg.timestamp);
        edge.delay = msg.cltv_expiry_delta;
        edge.htlc_minimum_msat = msg.htlc_minimum_msat;
        edge.base_fee = msg.fee_base_msat;
        edge.proportional_fee = msg.fee_proportional_millionths;
        edge.active = !msg.is_disabled();
        edge.update = Some(msg.raw.clone());

        tracing::debug!(
            edge = %key,
            base_fee = msg.fee_base_msat,
            proportional_fee = msg.fee_proportional_millionths,
            delay = msg.cltv_expiry_delta,
            active = !msg.is_disabled(),
            "applied channel update"
        );

        self.sink.store_for_rebroadcast(
            GossipKind::ChannelUpdate,
            BroadcastTag::Update(key),
            msg.timestamp,
            msg.raw.clone(),
        );
        Ok(UpdateOutcome::Applied)
    }

    /// Apply a node announcement to a node already known from a channel.
    pub fn handle_node_announcement(
        &mut self,
        msg: &NodeAnnouncement,
    ) -> Result<UpdateOutcome, GossipError> {
        let Some(node) = self.nodes.get_mut(&msg.node_id) else {
            tracing::debug!(
                node_id = %msg.node_id,
                "node announcement for unknown node, not preceded by a channel announcement"
            );
            return Err(GossipError::UnknownNode {
                node_id: msg.node_id,
            });
        };

        if let Some(last) = node.last_timestamp {
            if last >= msg.timestamp {
                tracing::debug!(
                    node_id = %msg.node_id,
                    last_timestamp = last,
                    timestamp = msg.timestamp,
                    "ignoring outdated node announcement"
                );
                return Ok(UpdateOutcome::Stale);
            }
        }

        node.last_timestamp = Some(msg.timestamp);
        node.addresses = msg.addresses.clone();
        node.color = msg.rgb_color;
        node.alias = msg.alias.clone();
        node.announcement = Some(msg.raw.clone());

        tracing::debug!(
            node_id = %msg.node_id,
            alias = %msg.alias,
            addresses = msg.addresses.len(),
            "applied node announcement"
        );

        self.sink.store_for_rebroadcast(
            GossipKind::NodeAnnouncement,
            BroadcastTag::Node(msg.node_id),
            msg.timestamp,
            msg.raw.clone(),
        );
        Ok(UpdateOutcome::Applied)
    }

    /// Dispatch any gossip record to its handler.
    pub fn handle_gossip(&mut self, msg: &GossipMessage) -> Result<GossipOutcome, GossipError> {
        match msg {
            GossipMessage::ChannelAnnouncement(m) => self
                .handle_channel_announcement(m)
                .map(|local| GossipOutcome::Channel { local }),
            GossipMessage::ChannelUpdate(m) => self
                .handle_channel_update(m)
                .map(GossipOutcome::ChannelUpdate),
            GossipMessage::NodeAnnouncement(m) => self
                .handle_node_announcement(m)
                .map(GossipOutcome::NodeUpdate),
        }
    }

    fn check_chain(&self, kind: GossipKind, received: &ChainHash) -> Result<(), GossipError> {
        if received != self.chain_hash() {
            tracing::debug!(
                %kind,
                expected = %self.chain_hash(),
                received = %received,
                "rejecting gossip for foreign chain"
            );
            return Err(GossipError::ChainMismatch {
                kind,
                expected: *self.chain_hash(),
                received: *received,
            });
        }
        Ok(())
    }
}
