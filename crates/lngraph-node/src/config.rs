//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use lngraph_core::{ChainHash, NodeId};
use lngraph_routing::{risk_factor_from_annual_percent, PathFinderConfig, MAX_HOPS};

use crate::error::NodeError;

/// Full configuration for an lngraph node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphConfig {
    /// Which chain gossip must belong to.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Identity of this node.
    #[serde(default)]
    pub node: NodeConfig,

    /// Route finding defaults.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Gossip ingestion settings.
    #[serde(default)]
    pub gossip: GossipConfig,

    /// Stale channel pruning.
    #[serde(default)]
    pub pruning: PruningConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Network name: bitcoin, testnet or regtest.
    #[serde(default = "default_network")]
    pub network: String,
    /// Explicit genesis hash (hex), overriding `network`.
    #[serde(default)]
    pub chain_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeConfig {
    /// This node's public key (hex).
    #[serde(default)]
    pub local_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Maximum route length.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Yearly cost of locked funds, in percent.
    #[serde(default = "default_annual_risk_percent")]
    pub annual_risk_percent: f64,
    /// CLTV delta required at the destination.
    #[serde(default = "default_final_cltv")]
    pub final_cltv: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipConfig {
    /// Capacity of the ingestion queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruningConfig {
    /// Whether the periodic pruning task runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between pruning passes.
    #[serde(default = "default_prune_interval")]
    pub interval_secs: u64,
    /// Channels without an update for this many seconds are removed.
    #[serde(default = "default_prune_max_age")]
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_network() -> String {
    "bitcoin".into()
}
fn default_max_hops() -> usize {
    MAX_HOPS
}
fn default_annual_risk_percent() -> f64 {
    1.0
}
fn default_final_cltv() -> u32 {
    9
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_true() -> bool {
    true
}
fn default_prune_interval() -> u64 {
    3600
}
fn default_prune_max_age() -> u64 {
    14 * 24 * 60 * 60
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            chain_hash: None,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            annual_risk_percent: default_annual_risk_percent(),
            final_cltv: default_final_cltv(),
        }
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_prune_interval(),
            max_age_secs: default_prune_max_age(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl RoutingConfig {
    /// Per-block risk factor handed to the path finder.
    pub fn risk_factor(&self) -> f64 {
        risk_factor_from_annual_percent(self.annual_risk_percent)
    }

    pub fn path_finder_config(&self) -> PathFinderConfig {
        PathFinderConfig {
            max_hops: self.max_hops,
        }
    }
}

impl PruningConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl GraphConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: GraphConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Chain hash gossip is checked against.
    pub fn chain_hash(&self) -> Result<ChainHash, NodeError> {
        match &self.chain.chain_hash {
            Some(hex) => Ok(hex.parse()?),
            None => Ok(ChainHash::for_network(&self.chain.network)?),
        }
    }

    /// This node's identity; required to run the graph service.
    pub fn local_id(&self) -> Result<NodeId, NodeError> {
        let hex = self
            .node
            .local_id
            .as_deref()
            .ok_or_else(|| NodeError::InvalidConfig("node.local_id is not set".into()))?;
        Ok(hex.parse()?)
    }

    /// Check every field that can be wrong independently of the others.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.chain_hash()?;
        self.local_id()?;
        self.routing
            .path_finder_config()
            .validate()
            .map_err(|e| NodeError::InvalidConfig(e.to_string()))?;
        if !self.routing.annual_risk_percent.is_finite() || self.routing.annual_risk_percent < 0.0
        {
            return Err(NodeError::InvalidConfig(format!(
                "routing.annual_risk_percent must be a non-negative number, got {}",
                self.routing.annual_risk_percent
            )));
        }
        if self.gossip.queue_capacity == 0 {
            return Err(NodeError::InvalidConfig(
                "gossip.queue_capacity must be positive".into(),
            ));
        }
        if self.pruning.enabled && self.pruning.interval_secs == 0 {
            return Err(NodeError::InvalidConfig(
                "pruning.interval_secs must be positive".into(),
            ));
        }
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(NodeError::InvalidConfig(format!(
                "unknown logging.format: {}",
                other
            ))),
        }
    }
}
