//! lngraph node: runs the channel graph inside an async process.
//!
//! - [`GraphConfig`]: TOML configuration with defaults for every field.
//! - [`logging::init`]: tracing subscriber setup.
//! - [`GraphService`]: single-writer gossip ingestion with concurrent,
//!   read-locked route queries and periodic pruning.

pub mod config;
pub mod error;
pub mod logging;
pub mod service;

pub use config::GraphConfig;
pub use error::NodeError;
pub use service::{GraphEvent, GraphService, IngestSnapshot, IngestStats};
