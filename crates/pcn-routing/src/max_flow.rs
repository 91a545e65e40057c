use std::collections::{HashMap, HashSet};

use pcn_core::{
    path_edges, search, CreditNetwork, DirectedEdge, NetworkError, NodeId, Path, Payment,
    ResidualGraph, BALANCE_EPSILON,
};

use crate::attempt::Attempt;
use crate::error::RoutingError;
use crate::outcome::{FailureReason, MessageCounts, RouteOutcome};
use crate::strategy::{precheck, RoutingStrategy};
use crate::waterfill::{water_fill, ALLOCATION_TOLERANCE};

/// Default bound on augmenting iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Augmenting paths found by [`augmenting_paths`] with their bottlenecks.
///
/// A later path may run backwards over a channel that an earlier path
/// pushed flow through, so the paths are not independently usable. Use
/// [`FlowProbe::decompose`] to get paths that can be committed side by side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowProbe {
    pub paths: Vec<(Path, f64)>,
    pub probe_messages: u64,
}

impl FlowProbe {
    /// Total flow pushed from source to destination.
    pub fn total_capacity(&self) -> f64 {
        self.paths.iter().map(|(_, cap)| cap).sum()
    }

    /// Net flow per directed edge, keeping only the direction that carries
    /// more.
    fn net_flow(&self) -> HashMap<DirectedEdge, f64> {
        let mut gross: HashMap<DirectedEdge, f64> = HashMap::new();
        for (path, flow) in &self.paths {
            for edge in path_edges(path) {
                *gross.entry(edge).or_insert(0.0) += flow;
            }
        }
        gross
            .iter()
            .filter_map(|(&(u, v), &forward)| {
                let net = forward - gross.get(&(v, u)).copied().unwrap_or(0.0);
                (net > BALANCE_EPSILON).then_some(((u, v), net))
            })
            .collect()
    }

    /// Split the probed flow into paths that only follow its net direction.
    ///
    /// Discovered paths come first, in discovery order, each with as much
    /// of its bottleneck as the net flow still holds. Whatever is left is
    /// traced out by search on `network`. Flow on cycles carries nothing
    /// from `src` to `dst` and is dropped. Every returned path can take its
    /// full flow even after the others have been committed.
    pub fn decompose(
        &self,
        network: &CreditNetwork,
        src: NodeId,
        dst: NodeId,
    ) -> Vec<(Path, f64)> {
        if src == dst {
            return Vec::new();
        }
        let mut net = self.net_flow();
        let mut flows = Vec::new();

        for (path, cap) in &self.paths {
            let flow = bottleneck(&net, path).min(*cap);
            if flow > BALANCE_EPSILON {
                drain(&mut net, path, flow);
                flows.push((path.clone(), flow));
            }
        }
        loop {
            let Some(path) =
                search::shortest_path(network, src, dst, |u, v| net.contains_key(&(u, v)))
            else {
                break;
            };
            let flow = bottleneck(&net, &path);
            drain(&mut net, &path, flow);
            flows.push((path, flow));
        }
        flows
    }
}

fn bottleneck(net: &HashMap<DirectedEdge, f64>, path: &[NodeId]) -> f64 {
    path_edges(path)
        .map(|edge| net.get(&edge).copied().unwrap_or(0.0))
        .fold(f64::INFINITY, f64::min)
}

/// Remove `flow` from every edge of `path`; edges left empty are dropped.
fn drain(net: &mut HashMap<DirectedEdge, f64>, path: &[NodeId], flow: f64) {
    for edge in path_edges(path) {
        if let Some(left) = net.get_mut(&edge) {
            *left -= flow;
            if *left <= BALANCE_EPSILON {
                net.remove(&edge);
            }
        }
    }
}

/// Repeatedly take the hop-shortest path through edges with residual
/// balance and push its bottleneck, at most `max_iterations` times.
///
/// `allowed`, when given, restricts the search to those directed edges.
/// The network is read through a [`ResidualGraph`] and never changes.
pub fn augmenting_paths(
    network: &CreditNetwork,
    src: NodeId,
    dst: NodeId,
    max_iterations: usize,
    allowed: Option<&HashSet<DirectedEdge>>,
) -> Result<FlowProbe, NetworkError> {
    let mut residual = ResidualGraph::new(network);
    let mut probe = FlowProbe::default();

    for _ in 0..max_iterations {
        let Some(path) = residual.shortest_path(src, dst, |u, v| {
            allowed.map_or(true, |edges| edges.contains(&(u, v)))
        }) else {
            break;
        };
        let capacity = residual.path_capacity(&path)?;
        probe.probe_messages += path.len().saturating_sub(1) as u64;
        residual.push(&path, capacity)?;
        probe.paths.push((path, capacity));
    }
    Ok(probe)
}

/// Water-fill `payment` over the decomposed probe flow and commit it.
///
/// Paths are committed in order, each with the smaller of its share and its
/// live capacity, until the amount is placed. A shortfall rolls every commit
/// back. Commit messages are only counted once the attempt settles.
pub(crate) fn commit_water_filled(
    network: &mut CreditNetwork,
    payment: &Payment,
    probe: &FlowProbe,
    messages: &mut MessageCounts,
) -> Result<Option<FailureReason>, NetworkError> {
    let flows = probe.decompose(network, payment.src, payment.dst);
    let capacities: Vec<f64> = flows.iter().map(|(_, flow)| *flow).collect();
    let shares = water_fill(payment.amount, &capacities);

    let mut attempt = Attempt::begin(network);
    let mut committed = MessageCounts::default();
    let mut delivered = 0.0;
    for ((path, _), share) in flows.iter().zip(shares) {
        let remaining = payment.amount - delivered;
        if remaining <= ALLOCATION_TOLERANCE {
            break;
        }
        let send = share.min(attempt.capacity(path)?).min(remaining);
        if send <= 0.0 {
            continue;
        }
        attempt.commit(path, send)?;
        committed.commit_path(path);
        delivered += send;
    }

    if delivered + ALLOCATION_TOLERANCE < payment.amount {
        attempt.rollback()?;
        tracing::debug!(
            src = payment.src,
            dst = payment.dst,
            delivered,
            amount = payment.amount,
            "committed flow fell short"
        );
        return Ok(Some(FailureReason::InsufficientCapacity));
    }
    attempt.settle();
    *messages += committed;
    Ok(None)
}

/// Probe augmenting paths, then either commit the payment or report why
/// not. Shared by [`MaxFlow`], the flash dispatcher and partitioned routing.
pub(crate) fn route_max_flow(
    network: &mut CreditNetwork,
    payment: &Payment,
    max_iterations: usize,
    allowed: Option<&HashSet<DirectedEdge>>,
) -> Result<RouteOutcome, RoutingError> {
    let probe = augmenting_paths(network, payment.src, payment.dst, max_iterations, allowed)?;
    let mut messages = MessageCounts {
        probe: probe.probe_messages,
        ..MessageCounts::default()
    };

    if probe.paths.is_empty() {
        let connected = search::shortest_path(&*network, payment.src, payment.dst, |u, v| {
            allowed.map_or(true, |edges| edges.contains(&(u, v)))
        })
        .is_some();
        let reason = if connected {
            FailureReason::InsufficientCapacity
        } else {
            FailureReason::NoPath
        };
        return Ok(RouteOutcome::failed(reason, messages));
    }

    let total = probe.total_capacity();
    if total + ALLOCATION_TOLERANCE < payment.amount {
        tracing::debug!(
            src = payment.src,
            dst = payment.dst,
            paths = probe.paths.len(),
            total,
            amount = payment.amount,
            "augmenting paths too narrow"
        );
        return Ok(RouteOutcome::failed(
            FailureReason::InsufficientCapacity,
            messages,
        ));
    }

    match commit_water_filled(network, payment, &probe, &mut messages)? {
        None => Ok(RouteOutcome::delivered(payment.amount, messages)),
        Some(reason) => Ok(RouteOutcome::failed(reason, messages)),
    }
}

/// Multi-path routing over up to `max_iterations` augmenting paths, with
/// the amount split by max-min fair water-filling.
#[derive(Debug)]
pub struct MaxFlow {
    max_iterations: usize,
}

impl MaxFlow {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Default for MaxFlow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl RoutingStrategy for MaxFlow {
    fn name(&self) -> &'static str {
        "max_flow"
    }

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError> {
        if let Some(outcome) = precheck(network, payment)? {
            return Ok(outcome);
        }
        route_max_flow(network, payment, self.max_iterations, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> CreditNetwork {
        CreditNetwork::from_directed_edges([
            (0, 1, 10.0),
            (1, 0, 10.0),
            (1, 3, 10.0),
            (3, 1, 10.0),
            (0, 2, 10.0),
            (2, 0, 10.0),
            (2, 3, 10.0),
            (3, 2, 10.0),
        ])
        .unwrap()
    }

    /// Trunk 0-1-2-3 (10) with one-way detours 0-4-2, 1-5-3, 0-6-2 and
    /// 1-7-3 (4 each). Later augmenting paths cross the trunk backwards
    /// over 2 -> 1.
    fn crossing() -> CreditNetwork {
        CreditNetwork::from_directed_edges([
            (0, 1, 10.0),
            (1, 2, 10.0),
            (2, 3, 10.0),
            (0, 4, 4.0),
            (4, 2, 4.0),
            (1, 5, 4.0),
            (5, 3, 4.0),
            (0, 6, 4.0),
            (6, 2, 4.0),
            (1, 7, 4.0),
            (7, 3, 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_diamond_splits_evenly() {
        let mut net = diamond();
        let outcome = MaxFlow::default()
            .route(&mut net, &Payment::new(0, 3, 15.0))
            .unwrap();
        assert!(outcome.is_delivered());
        assert_eq!(outcome.sent, 15.0);
        assert_eq!(outcome.messages.probe, 4);
        assert_eq!(outcome.messages.commit, 4);
        for (a, b) in [(0, 1), (1, 3), (0, 2), (2, 3)] {
            assert!((net.balance(a, b).unwrap() - 2.5).abs() < 1e-9);
            assert!((net.balance(b, a).unwrap() - 17.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_diamond_insufficient_restores() {
        let mut net = diamond();
        let before = net.directed_balances();
        let outcome = MaxFlow::default()
            .route(&mut net, &Payment::new(0, 3, 25.0))
            .unwrap();
        assert_eq!(outcome.sent, 0.0);
        assert_eq!(outcome.failure(), Some(FailureReason::InsufficientCapacity));
        assert_eq!(outcome.messages.commit, 0);
        assert_eq!(net.directed_balances(), before);
    }

    #[test]
    fn test_iteration_bound() {
        let net = diamond();
        let probe = augmenting_paths(&net, 0, 3, 1, None).unwrap();
        assert_eq!(probe.paths, vec![(vec![0, 1, 3], 10.0)]);
        assert_eq!(probe.probe_messages, 2);
        assert_eq!(net.balance(0, 1).unwrap(), 10.0);
    }

    #[test]
    fn test_allowed_edges_restrict_search() {
        let net = diamond();
        let allowed: HashSet<DirectedEdge> = [(0, 2), (2, 3)].into_iter().collect();
        let probe = augmenting_paths(&net, 0, 3, 10, Some(&allowed)).unwrap();
        assert_eq!(probe.paths, vec![(vec![0, 2, 3], 10.0)]);
    }

    #[test]
    fn test_exhausted_edges_vs_no_path() {
        let mut net = CreditNetwork::from_directed_edges([(0, 1, 0.0), (1, 0, 5.0)]).unwrap();
        net.add_channel(5, 6, 1.0, 1.0).unwrap();
        let mut router = MaxFlow::default();
        let exhausted = router.route(&mut net, &Payment::new(0, 1, 1.0)).unwrap();
        assert_eq!(exhausted.failure(), Some(FailureReason::InsufficientCapacity));
        let unreachable = router.route(&mut net, &Payment::new(0, 6, 1.0)).unwrap();
        assert_eq!(unreachable.failure(), Some(FailureReason::NoPath));
    }

    #[test]
    fn test_crossing_paths_reuse_reversed_flow() {
        let net = crossing();
        let probe = augmenting_paths(&net, 0, 3, 20, None).unwrap();
        assert_eq!(
            probe.paths,
            vec![
                (vec![0, 1, 2, 3], 10.0),
                (vec![0, 4, 2, 1, 5, 3], 4.0),
                (vec![0, 6, 2, 1, 7, 3], 4.0),
            ]
        );
        assert_eq!(probe.probe_messages, 13);
        assert_eq!(probe.total_capacity(), 18.0);
    }

    #[test]
    fn test_decompose_follows_net_flow() {
        let net = crossing();
        let probe = augmenting_paths(&net, 0, 3, 20, None).unwrap();
        let flows = probe.decompose(&net, 0, 3);
        assert_eq!(
            flows,
            vec![
                (vec![0, 1, 2, 3], 2.0),
                (vec![0, 1, 5, 3], 4.0),
                (vec![0, 1, 7, 3], 4.0),
                (vec![0, 4, 2, 3], 4.0),
                (vec![0, 6, 2, 3], 4.0),
            ]
        );
        for (path, _) in &flows {
            assert!(path.windows(2).all(|e| net.balance(e[0], e[1]).unwrap() > 0.0));
        }
    }

    #[test]
    fn test_small_payment_over_crossing_paths() {
        let mut net = crossing();
        let total = net.total_balance();
        let outcome = MaxFlow::default()
            .route(&mut net, &Payment::new(0, 3, 3.0))
            .unwrap();
        assert!(outcome.is_delivered(), "{outcome:?}");
        assert_eq!(outcome.sent, 3.0);
        assert_eq!(outcome.messages.probe, 13);
        assert_eq!(outcome.messages.commit, 15);
        assert!((net.balance(0, 1).unwrap() - 8.2).abs() < 1e-9);
        assert!((net.balance(1, 2).unwrap() - 9.4).abs() < 1e-9);
        assert!((net.balance(2, 3).unwrap() - 8.2).abs() < 1e-9);
        let received =
            net.balance(3, 2).unwrap() + net.balance(3, 5).unwrap() + net.balance(3, 7).unwrap();
        assert!((received - 3.0).abs() < 1e-9);
        assert!((net.total_balance() - total).abs() < 1e-9);
    }

    #[test]
    fn test_full_probed_capacity_is_deliverable() {
        let mut net = crossing();
        let outcome = MaxFlow::default()
            .route(&mut net, &Payment::new(0, 3, 18.0))
            .unwrap();
        assert!(outcome.is_delivered(), "{outcome:?}");
        for (a, b) in [(0, 1), (0, 4), (0, 6)] {
            assert!(net.balance(a, b).unwrap().abs() < 1e-9);
        }
        assert!(net
            .directed_balances()
            .iter()
            .all(|(_, b)| *b >= -BALANCE_EPSILON));

        let mut net = crossing();
        let outcome = MaxFlow::default()
            .route(&mut net, &Payment::new(0, 3, 18.5))
            .unwrap();
        assert_eq!(outcome.failure(), Some(FailureReason::InsufficientCapacity));
    }

    #[test]
    fn test_rolled_back_commit_counts_no_messages() {
        let mut net = diamond();
        net.apply(&[0, 2], 9.0).unwrap();
        let before = net.directed_balances();
        let stale = FlowProbe {
            paths: vec![(vec![0, 1, 3], 10.0), (vec![0, 2, 3], 10.0)],
            probe_messages: 4,
        };
        let mut messages = MessageCounts::default();
        let failure =
            commit_water_filled(&mut net, &Payment::new(0, 3, 15.0), &stale, &mut messages)
                .unwrap();
        assert_eq!(failure, Some(FailureReason::InsufficientCapacity));
        assert_eq!(messages.commit, 0);
        assert_eq!(net.directed_balances(), before);
    }
}
