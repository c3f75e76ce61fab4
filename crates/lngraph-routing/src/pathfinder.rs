//! Bounded-hop route finding.
//!
//! A Bellman-Ford variant run backwards from the destination: the amount
//! the destination must receive is known, so each relaxation step derives
//! what the previous node has to put in. Row `k` of the table holds the
//! cheapest known way for every node to reach the destination in at most
//! `k` hops. Cost is total amount plus a risk premium for locked funds.

use std::collections::{HashMap, HashSet};

use lngraph_core::{EdgeKey, MilliSatoshi, NodeId};

use crate::error::RoutingError;
use crate::graph::RoutingState;
use crate::route::{Route, RouteHop};

/// Hop ceiling; matches the maximum onion route length.
pub const MAX_HOPS: usize = 20;

/// Average blocks mined per year, for converting annual risk rates.
pub const BLOCKS_PER_YEAR: u32 = 52_596;

/// Per-block risk factor for a yearly rate given in percent.
pub fn risk_factor_from_annual_percent(percent: f64) -> f64 {
    percent / 100.0 / f64::from(BLOCKS_PER_YEAR)
}

/// Configuration for the PathFinder algorithm.
#[derive(Debug, Clone)]
pub struct PathFinderConfig {
    /// Maximum number of hops allowed in a single route.
    pub max_hops: usize,
}

impl Default for PathFinderConfig {
    fn default() -> Self {
        Self { max_hops: MAX_HOPS }
    }
}

impl PathFinderConfig {
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.max_hops == 0 || self.max_hops > MAX_HOPS {
            return Err(RoutingError::MaxHopsExceeded {
                max_hops: self.max_hops,
                ceiling: MAX_HOPS,
            });
        }
        Ok(())
    }
}

/// Best known way for a node to reach the destination.
#[derive(Debug, Clone, Copy)]
struct Label {
    /// Amount this node must put in.
    total: u64,
    /// Ranking surcharge on top of `total`: the risk premium, plus the
    /// sender's own fee once the first hop is chosen.
    risk: u64,
    /// Edge taken and the row holding the next node's label; `None` at the
    /// destination itself.
    next: Option<(EdgeKey, usize)>,
}

impl Label {
    fn cost(&self) -> u64 {
        self.total.saturating_add(self.risk)
    }
}

type Row = HashMap<NodeId, Label>;

/// Premium for locking `amount` for `delay` blocks. The constant 1 makes
/// every hop cost something, so fewer hops win ties.
fn risk_fee(amount: u64, delay: u16, risk_factor: f64) -> u64 {
    let premium = amount as f64 * f64::from(delay) * risk_factor;
    1u64.saturating_add(premium as u64)
}

/// Finds cheapest bounded-hop routes through a [`RoutingState`].
#[derive(Debug, Clone)]
pub struct PathFinder {
    config: PathFinderConfig,
}

impl PathFinder {
    /// Create a new PathFinder with the given configuration.
    pub fn new(config: PathFinderConfig) -> Self {
        Self { config }
    }

    /// Create a PathFinder with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: PathFinderConfig::default(),
        }
    }

    pub fn config(&self) -> &PathFinderConfig {
        &self.config
    }

    /// Find the cheapest route delivering `amount` from `source` to
    /// `destination`.
    ///
    /// `risk_factor` is the per-block cost of locking one millisatoshi;
    /// `final_delay` is the CLTV delta the destination requires.
    pub fn find_route(
        &self,
        state: &RoutingState,
        source: &NodeId,
        destination: &NodeId,
        amount: MilliSatoshi,
        risk_factor: f64,
        final_delay: u32,
    ) -> Result<Route, RoutingError> {
        if amount >= MilliSatoshi::MAX_SUPPLY {
            return Err(RoutingError::AmountTooLarge {
                amount,
                max: MilliSatoshi::MAX_SUPPLY,
            });
        }
        if !risk_factor.is_finite() || risk_factor < 0.0 {
            return Err(RoutingError::InvalidRiskFactor { risk_factor });
        }
        if source == destination {
            return Err(RoutingError::RouteToSelf { node_id: *source });
        }
        for id in [source, destination] {
            if !state.contains_node(id) {
                return Err(RoutingError::UnknownParticipant { node_id: *id });
            }
        }

        let max_hops = self.config.max_hops.clamp(1, MAX_HOPS);
        let search = Search {
            state,
            source,
            max_hops,
            risk_factor,
        };

        let (rows, skipped_for_minimum) = search.run(destination, amount, true);
        if let Some(route) = search.reconstruct(&rows, final_delay) {
            tracing::debug!(
                from = %source,
                to = %destination,
                hops = route.hop_count(),
                amount_sent = %route.amount_sent(),
                "found route"
            );
            return Ok(route);
        }

        if skipped_for_minimum {
            let (relaxed, _) = search.run(destination, amount, false);
            if relaxed.last().map_or(false, |row| row.contains_key(source)) {
                return Err(RoutingError::AmountBelowMinimum {
                    from: *source,
                    to: *destination,
                    amount,
                });
            }
        }

        Err(RoutingError::NoRouteFound {
            from: *source,
            to: *destination,
        })
    }
}

impl Default for PathFinder {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// [`PathFinder::find_route`] with the default hop ceiling.
pub fn find_route(
    state: &RoutingState,
    source: &NodeId,
    destination: &NodeId,
    amount: MilliSatoshi,
    risk_factor: f64,
    final_delay: u32,
) -> Result<Route, RoutingError> {
    PathFinder::with_defaults().find_route(
        state,
        source,
        destination,
        amount,
        risk_factor,
        final_delay,
    )
}

/// One query's view of the graph. The rows it builds are owned by the
/// caller of `run` and dropped with the query.
struct Search<'a> {
    state: &'a RoutingState,
    source: &'a NodeId,
    max_hops: usize,
    risk_factor: f64,
}

impl Search<'_> {
    /// Build the row table. Also reports whether any edge was skipped
    /// because the amount was below its minimum.
    fn run(
        &self,
        destination: &NodeId,
        amount: MilliSatoshi,
        enforce_minimum: bool,
    ) -> (Vec<Row>, bool) {
        let mut skipped_for_minimum = false;
        let mut rows: Vec<Row> = Vec::with_capacity(self.max_hops + 1);

        let mut first = Row::new();
        first.insert(
            *destination,
            Label {
                total: amount.value(),
                risk: 0,
                next: None,
            },
        );
        rows.push(first);

        // Only labels that changed in the previous row can produce new candidates.
        let mut changed: HashSet<NodeId> = HashSet::from([*destination]);

        for k in 1..=self.max_hops {
            let prev = &rows[k - 1];
            let mut row = prev.clone();
            let mut next_changed = HashSet::new();

            for node in &changed {
                // The sender never forwards on behalf of others.
                if node == self.source {
                    continue;
                }
                let Some(label) = prev.get(node) else {
                    continue;
                };

                for edge in self.state.inbound_edges(node) {
                    if !edge.active {
                        continue;
                    }
                    if enforce_minimum && edge.htlc_minimum_msat > label.total {
                        skipped_for_minimum = true;
                        continue;
                    }

                    let fee = edge.fee_for(MilliSatoshi(label.total)).value();
                    let charged = label.total.saturating_add(fee);
                    if charged >= MilliSatoshi::MAX_SUPPLY.value() {
                        continue;
                    }
                    let mut risk = label
                        .risk
                        .saturating_add(risk_fee(charged, edge.delay, self.risk_factor));
                    // The sender does not pay its own fee, but the fee still
                    // ranks its first hops.
                    let from_sender = edge.source == *self.source;
                    let total = if from_sender {
                        risk = risk.saturating_add(fee);
                        label.total
                    } else {
                        charged
                    };

                    let candidate = Label {
                        total,
                        risk,
                        next: Some((edge.key, k - 1)),
                    };
                    // Ties go to the smaller edge key, keeping results independent
                    // of hash iteration order.
                    let better = row.get(&edge.source).map_or(true, |current| {
                        (candidate.cost(), candidate.next) < (current.cost(), current.next)
                    });
                    if better {
                        row.insert(edge.source, candidate);
                        next_changed.insert(edge.source);
                    }
                }
            }

            tracing::trace!(row = k, improved = next_changed.len(), "relaxed row");
            rows.push(row);
            if next_changed.is_empty() {
                break;
            }
            changed = next_changed;
        }

        (rows, skipped_for_minimum)
    }

    /// Walk the chosen edges from the source's label in the last row.
    fn reconstruct(&self, rows: &[Row], final_delay: u32) -> Option<Route> {
        let mut label = *rows.last()?.get(self.source)?;
        let mut steps = Vec::new();

        while let Some((key, row)) = label.next {
            let edge = self.state.edge(&key)?;
            let next = *rows.get(row)?.get(&edge.destination)?;
            steps.push((edge, next.total));
            label = next;
        }

        let mut delay = final_delay;
        let mut hops: Vec<RouteHop> = steps
            .iter()
            .rev()
            .map(|(edge, amount)| {
                delay = delay.saturating_add(u32::from(edge.delay));
                RouteHop {
                    channel_id: edge.short_channel_id(),
                    node_id: edge.destination,
                    amount: MilliSatoshi(*amount),
                    delay,
                }
            })
            .collect();
        hops.reverse();

        Some(Route::new(hops))
    }
}
