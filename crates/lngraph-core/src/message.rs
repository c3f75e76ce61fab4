//! Decoded gossip records, as handed over by the wire decoder after
//! signature verification. Each keeps its raw payload for rebroadcast.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::CoreError;
use crate::types::{ChainHash, Direction, NodeId, ShortChannelId};

/// Maximum length of a node alias in bytes.
pub const MAX_ALIAS_LEN: usize = 32;

bitflags::bitflags! {
    /// `channel_flags` field of a channel update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ChannelUpdateFlags: u16 {
        const DIRECTION = 0b0000_0001;
        const DISABLED = 0b0000_0010;
    }
}

/// RGB display colour of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", hex::encode(self.0))
    }
}

/// Node alias: up to 32 bytes, not NUL-terminated, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAlias(Vec<u8>);

impl NodeAlias {
    /// Build from raw bytes; trailing NUL padding is stripped.
    pub fn new(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() > MAX_ALIAS_LEN {
            return Err(CoreError::AliasTooLong {
                len: bytes.len(),
                max: MAX_ALIAS_LEN,
            });
        }
        let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        Ok(Self(bytes[..end].to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// A reachable network address advertised in a node announcement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetAddress {
    IpV4 { addr: Ipv4Addr, port: u16 },
    IpV6 { addr: Ipv6Addr, port: u16 },
    TorV2 { onion: [u8; 10], port: u16 },
    TorV3 {
        public_key: [u8; 32],
        checksum: u16,
        version: u8,
        port: u16,
    },
}

impl NetAddress {
    pub fn port(&self) -> u16 {
        match self {
            NetAddress::IpV4 { port, .. }
            | NetAddress::IpV6 { port, .. }
            | NetAddress::TorV2 { port, .. }
            | NetAddress::TorV3 { port, .. } => *port,
        }
    }
}

/// Announces a channel between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAnnouncement {
    pub chain_hash: ChainHash,
    pub short_channel_id: ShortChannelId,
    pub node_id_1: NodeId,
    pub node_id_2: NodeId,
    pub raw: Bytes,
}

/// Sets the forwarding policy of one direction of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    pub chain_hash: ChainHash,
    pub short_channel_id: ShortChannelId,
    pub timestamp: u32,
    pub flags: ChannelUpdateFlags,
    pub cltv_expiry_delta: u16,
    pub htlc_minimum_msat: u64,
    pub fee_base_msat: u32,
    pub fee_proportional_millionths: u32,
    pub raw: Bytes,
}

impl ChannelUpdate {
    /// Direction of the edge this update targets.
    pub fn direction(&self) -> Direction {
        Direction::from_bit(self.flags.bits())
    }

    pub fn is_disabled(&self) -> bool {
        self.flags.contains(ChannelUpdateFlags::DISABLED)
    }
}

/// Describes a node: alias, colour and addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAnnouncement {
    pub node_id: NodeId,
    pub timestamp: u32,
    pub rgb_color: Color,
    pub alias: NodeAlias,
    pub addresses: Vec<NetAddress>,
    pub raw: Bytes,
}

/// Kind of a gossip message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GossipKind {
    ChannelAnnouncement,
    ChannelUpdate,
    NodeAnnouncement,
}

impl fmt::Display for GossipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GossipKind::ChannelAnnouncement => "channel_announcement",
            GossipKind::ChannelUpdate => "channel_update",
            GossipKind::NodeAnnouncement => "node_announcement",
        };
        f.write_str(name)
    }
}

/// Any of the three gossip records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipMessage {
    ChannelAnnouncement(ChannelAnnouncement),
    ChannelUpdate(ChannelUpdate),
    NodeAnnouncement(NodeAnnouncement),
}

impl GossipMessage {
    pub fn kind(&self) -> GossipKind {
        match self {
            GossipMessage::ChannelAnnouncement(_) => GossipKind::ChannelAnnouncement,
            GossipMessage::ChannelUpdate(_) => GossipKind::ChannelUpdate,
            GossipMessage::NodeAnnouncement(_) => GossipKind::NodeAnnouncement,
        }
    }
}

impl From<ChannelAnnouncement> for GossipMessage {
    fn from(msg: ChannelAnnouncement) -> Self {
        GossipMessage::ChannelAnnouncement(msg)
    }
}

impl From<ChannelUpdate> for GossipMessage {
    fn from(msg: ChannelUpdate) -> Self {
        GossipMessage::ChannelUpdate(msg)
    }
}

impl From<NodeAnnouncement> for GossipMessage {
    fn from(msg: NodeAnnouncement) -> Self {
        GossipMessage::NodeAnnouncement(msg)
    }
}
