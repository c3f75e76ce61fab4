//! lngraph routing: the payment-channel graph and routing over it.
//!
//! This crate provides:
//! - [`RoutingState`]: the owned graph store of nodes and directional edges.
//! - Gossip handlers on [`RoutingState`] applying channel announcements,
//!   channel updates and node announcements under timestamp ordering.
//! - [`PathFinder`]: a bounded-hop Bellman-Ford search minimising fees plus
//!   a risk premium.
//! - [`BroadcastSink`] and [`BroadcastStore`]: hand-off of validated gossip
//!   for rebroadcast.
//! - Pruning of channels that stopped receiving updates.

pub mod broadcast;
pub mod error;
pub mod gossip;
pub mod graph;
pub mod pathfinder;
pub mod prune;
pub mod route;

// Re-exports for convenience.
pub use broadcast::{BroadcastEntry, BroadcastSink, BroadcastStore, BroadcastTag, NullSink};
pub use error::{GossipError, RoutingError};
pub use gossip::{GossipOutcome, UpdateOutcome};
pub use graph::{Edge, Node, RoutingState};
pub use lngraph_core::get_channel_direction;
pub use pathfinder::{
    find_route, risk_factor_from_annual_percent, PathFinder, PathFinderConfig, BLOCKS_PER_YEAR,
    MAX_HOPS,
};
pub use prune::{PruneStats, DEFAULT_PRUNE_AGE};
pub use route::{Route, RouteHop};
