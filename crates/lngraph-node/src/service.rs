//! Shared graph service.
//!
//! One background task owns all gossip mutation: messages are queued on a
//! bounded channel and applied in arrival order under the write lock. Route
//! queries take the read lock for the duration of one search, so any number
//! of them can run side by side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lngraph_core::{GossipMessage, MilliSatoshi, NodeId, ShortChannelId};
use lngraph_routing::{
    BroadcastSink, GossipOutcome, PathFinder, PruneStats, Route, RoutingState,
};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;

use crate::config::{GraphConfig, RoutingConfig};
use crate::error::NodeError;

/// Notifications emitted by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// A channel involving the local node entered the graph; the node should
    /// now announce itself.
    LocalChannelAnnounced(ShortChannelId),
    /// A pruning pass removed something.
    Pruned(PruneStats),
}

/// Work queued for the ingestion task.
enum Command {
    Gossip(GossipMessage),
    /// Replies once every earlier command has been applied.
    Flush(oneshot::Sender<()>),
}

/// Counters of ingestion results.
#[derive(Debug, Default)]
pub struct IngestStats {
    applied: AtomicU64,
    stale: AtomicU64,
    discarded: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSnapshot {
    /// Messages that changed the graph.
    pub applied: u64,
    /// Replays and duplicates.
    pub stale: u64,
    /// Foreign-chain or not-yet-known references.
    pub discarded: u64,
    /// Inconsistent or malformed messages.
    pub rejected: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle to a running graph: submit gossip, query routes.
pub struct GraphService {
    state: Arc<RwLock<RoutingState>>,
    command_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<GraphEvent>,
    stats: Arc<IngestStats>,
    path_finder: PathFinder,
    routing: RoutingConfig,
    prune_max_age: Duration,
    ingest_task: Option<JoinHandle<()>>,
    prune_task: Option<JoinHandle<()>>,
}

impl GraphService {
    /// Validate `config`, build an empty graph and start the background
    /// tasks. Must be called from within a tokio runtime.
    pub fn spawn(config: &GraphConfig, sink: Arc<dyn BroadcastSink>) -> Result<Self, NodeError> {
        config.validate()?;
        let chain_hash = config.chain_hash()?;
        let local_id = config.local_id()?;

        let state = Arc::new(RwLock::new(RoutingState::new(chain_hash, local_id, sink)));
        let (command_tx, command_rx) = mpsc::channel(config.gossip.queue_capacity);
        let (events_tx, _) = broadcast::channel(64);
        let stats = Arc::new(IngestStats::default());

        let ingest_task = tokio::spawn(run_ingest(
            state.clone(),
            command_rx,
            events_tx.clone(),
            stats.clone(),
        ));

        let prune_task = config.pruning.enabled.then(|| {
            tokio::spawn(run_prune(
                state.clone(),
                config.pruning.interval(),
                config.pruning.max_age(),
                events_tx.clone(),
            ))
        });

        tracing::info!(
            chain = %chain_hash,
            local_id = %local_id,
            pruning = config.pruning.enabled,
            "graph service started"
        );

        Ok(Self {
            state,
            command_tx,
            events_tx,
            stats,
            path_finder: PathFinder::new(config.routing.path_finder_config()),
            routing: config.routing.clone(),
            prune_max_age: config.pruning.max_age(),
            ingest_task: Some(ingest_task),
            prune_task,
        })
    }

    /// Queue a gossip message. Waits while the queue is full.
    pub async fn submit(&self, msg: impl Into<GossipMessage>) -> Result<(), NodeError> {
        self.command_tx
            .send(Command::Gossip(msg.into()))
            .await
            .map_err(|_| NodeError::ServiceStopped)
    }

    /// Wait until every message submitted so far has been applied.
    pub async fn flush(&self) -> Result<(), NodeError> {
        let (reply, done) = oneshot::channel();
        self.command_tx
            .send(Command::Flush(reply))
            .await
            .map_err(|_| NodeError::ServiceStopped)?;
        done.await.map_err(|_| NodeError::ServiceStopped)
    }

    /// Route with the configured risk factor and final CLTV.
    pub async fn find_route(
        &self,
        source: &NodeId,
        destination: &NodeId,
        amount: MilliSatoshi,
    ) -> Result<Route, NodeError> {
        self.find_route_with(
            source,
            destination,
            amount,
            self.routing.risk_factor(),
            self.routing.final_cltv,
        )
        .await
    }

    /// Route with an explicit risk factor and final CLTV. The search runs on
    /// the blocking pool while holding the read lock.
    pub async fn find_route_with(
        &self,
        source: &NodeId,
        destination: &NodeId,
        amount: MilliSatoshi,
        risk_factor: f64,
        final_delay: u32,
    ) -> Result<Route, NodeError> {
        let state = self.state.clone().read_owned().await;
        let path_finder = self.path_finder.clone();
        let (source, destination) = (*source, *destination);
        // A full search can take a while; keep it off the async workers.
        let route = tokio::task::spawn_blocking(move || {
            path_finder.find_route(&state, &source, &destination, amount, risk_factor, final_delay)
        })
        .await??;
        Ok(route)
    }

    /// Run a pruning pass now.
    pub async fn prune_now(&self) -> PruneStats {
        let stats = self
            .state
            .write()
            .await
            .prune_stale(Utc::now(), self.prune_max_age);
        if !stats.is_empty() {
            let _ = self.events_tx.send(GraphEvent::Pruned(stats.clone()));
        }
        stats
    }

    /// Read access to the graph.
    pub async fn read(&self) -> RwLockReadGuard<'_, RoutingState> {
        self.state.read().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events_tx.subscribe()
    }

    pub fn stats(&self) -> IngestSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting gossip, drain the queue and stop the background tasks.
    pub async fn shutdown(mut self) -> Result<(), NodeError> {
        if let Some(task) = self.prune_task.take() {
            task.abort();
        }
        let ingest = self.ingest_task.take();
        drop(self.command_tx);
        if let Some(task) = ingest {
            task.await.map_err(|_| NodeError::ServiceStopped)?;
        }
        tracing::info!("graph service stopped");
        Ok(())
    }
}

async fn run_ingest(
    state: Arc<RwLock<RoutingState>>,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<GraphEvent>,
    stats: Arc<IngestStats>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Gossip(msg) => {
                let result = state.write().await.handle_gossip(&msg);
                match result {
                    Ok(GossipOutcome::Channel { local }) => {
                        IngestStats::bump(&stats.applied);
                        if local {
                            if let GossipMessage::ChannelAnnouncement(ann) = &msg {
                                tracing::info!(
                                    scid = %ann.short_channel_id,
                                    "local channel announced"
                                );
                                let _ = events
                                    .send(GraphEvent::LocalChannelAnnounced(ann.short_channel_id));
                            }
                        }
                    }
                    Ok(GossipOutcome::ChannelUpdate(outcome))
                    | Ok(GossipOutcome::NodeUpdate(outcome)) => {
                        if outcome.is_applied() {
                            IngestStats::bump(&stats.applied);
                        } else {
                            IngestStats::bump(&stats.stale);
                        }
                    }
                    Err(e) if e.is_benign() => {
                        IngestStats::bump(&stats.discarded);
                        tracing::debug!(kind = %msg.kind(), error = %e, "discarded gossip");
                    }
                    Err(e) => {
                        IngestStats::bump(&stats.rejected);
                        tracing::warn!(kind = %msg.kind(), error = %e, "rejected gossip");
                    }
                }
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
    tracing::info!("gossip ingestion exited");
}

async fn run_prune(
    state: Arc<RwLock<RoutingState>>,
    interval: Duration,
    max_age: Duration,
    events: broadcast::Sender<GraphEvent>,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let stats = state.write().await.prune_stale(Utc::now(), max_age);
        if !stats.is_empty() {
            let _ = events.send(GraphEvent::Pruned(stats));
        }
    }
}
