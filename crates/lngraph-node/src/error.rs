use lngraph_core::CoreError;
use lngraph_routing::RoutingError;

/// Errors surfaced by the node layer.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("graph service has stopped")]
    ServiceStopped,

    #[error("route query aborted: {0}")]
    QueryAborted(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
