//! lngraph core: value types shared by the gossip and routing layers.
//!
//! - [`NodeId`], [`ShortChannelId`], [`EdgeKey`] and [`get_channel_direction`]
//!   identify participants and directional channel edges.
//! - [`ChannelAnnouncement`], [`ChannelUpdate`] and [`NodeAnnouncement`] are
//!   the decoded gossip records the graph is built from.

pub mod error;
pub mod message;
pub mod types;

pub use error::CoreError;
pub use message::{
    ChannelAnnouncement, ChannelUpdate, ChannelUpdateFlags, Color, GossipKind, GossipMessage,
    NetAddress, NodeAlias, NodeAnnouncement, MAX_ALIAS_LEN,
};
pub use types::{
    get_channel_direction, ChainHash, Direction, EdgeKey, MilliSatoshi, NodeId, ShortChannelId,
    CHAIN_HASH_SIZE, PUBLIC_KEY_SIZE,
};
