use std::collections::HashSet;

use pcn_core::{
    path_edges, search, CreditNetwork, DirectedEdge, NetworkError, NodeId, Path, Payment,
};

use crate::attempt::Attempt;
use crate::error::RoutingError;
use crate::outcome::{hops, FailureReason, MessageCounts, RouteOutcome};
use crate::strategy::{precheck, RoutingStrategy};
use crate::waterfill::{drain_largest, ALLOCATION_TOLERANCE};

/// Default number of edge-disjoint paths.
pub const DEFAULT_PATHS: usize = 4;

/// Up to `k` hop-shortest paths that share no directed edge, found by
/// removing each path's edges before searching again.
pub(crate) fn edge_disjoint_paths(
    network: &CreditNetwork,
    src: NodeId,
    dst: NodeId,
    k: usize,
) -> Vec<Path> {
    let mut used: HashSet<DirectedEdge> = HashSet::new();
    let mut paths = Vec::new();
    while paths.len() < k {
        let Some(path) = search::shortest_path(network, src, dst, |u, v| !used.contains(&(u, v)))
        else {
            break;
        };
        used.extend(path_edges(&path));
        paths.push(path);
    }
    paths
}

/// Multi-path routing over `k` edge-disjoint paths, balancing leftover
/// channel liquidity across them.
///
/// Commit messages are counted only for paths that receive a positive
/// share, and only when the payment goes through; a payment rejected by the
/// capacity check sends none. With a `payment_unit`, they are counted per
/// unit of value sent on each path instead of once per edge.
#[derive(Debug)]
pub struct Spider {
    k: usize,
    payment_unit: Option<f64>,
}

impl Spider {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            payment_unit: None,
        }
    }

    pub fn with_payment_unit(mut self, unit: f64) -> Self {
        self.payment_unit = Some(unit);
        self
    }

    fn commit_messages(&self, path: &[NodeId], share: f64) -> u64 {
        let units = match self.payment_unit {
            Some(unit) if unit > 0.0 => (share / unit).ceil() as u64,
            _ => 1,
        };
        hops(path) * units
    }
}

impl Default for Spider {
    fn default() -> Self {
        Self::new(DEFAULT_PATHS)
    }
}

impl RoutingStrategy for Spider {
    fn name(&self) -> &'static str {
        "spider"
    }

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError> {
        if let Some(outcome) = precheck(network, payment)? {
            return Ok(outcome);
        }
        let mut messages = MessageCounts::default();

        let paths = edge_disjoint_paths(network, payment.src, payment.dst, self.k);
        if paths.is_empty() {
            return Ok(RouteOutcome::failed(FailureReason::NoPath, messages));
        }

        let capacities = paths
            .iter()
            .map(|p| {
                messages.probe_path(p);
                network.path_capacity(p)
            })
            .collect::<Result<Vec<f64>, NetworkError>>()?;
        let total: f64 = capacities.iter().sum();
        if total + ALLOCATION_TOLERANCE < payment.amount {
            tracing::debug!(
                src = payment.src,
                dst = payment.dst,
                paths = paths.len(),
                total,
                "disjoint paths too narrow"
            );
            return Ok(RouteOutcome::failed(
                FailureReason::InsufficientCapacity,
                messages,
            ));
        }

        let shares = drain_largest(payment.amount, &capacities);
        let mut attempt = Attempt::begin(network);
        for (path, &share) in paths.iter().zip(&shares) {
            if share <= 0.0 {
                continue;
            }
            attempt.commit(path, share)?;
            messages.commit += self.commit_messages(path, share);
        }
        attempt.settle();
        Ok(RouteOutcome::delivered(payment.amount, messages))
    }
}
