//! Hierarchical routing over partitions and the index topology.
//!
//! Payments whose endpoints share a partition are tried with LND-style
//! retries inside that partition. Everything else, and every intra-partition
//! failure, is planned on the index topology: the `k` lightest index paths
//! are expanded segment by segment into real paths, and the payment is
//! routed by max-flow restricted to the channels those paths use.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use pcn_core::{path_edges, search, CreditNetwork, DirectedEdge, NodeId, Path, Payment};
use pcn_partition::{IndexTopology, PartitionError, PartitionId, PartitionSet};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::attempt::Attempt;
use crate::error::RoutingError;
use crate::lnd::probe_with_retries;
use crate::max_flow::route_max_flow;
use crate::outcome::{hops, FailureReason, MessageCounts, RouteOutcome, RouteScope};
use crate::strategy::{precheck, RoutingStrategy};
use crate::yen::{k_shortest_index_paths, weight, IndexPath};

/// Default number of index paths and of real paths per segment.
pub const DEFAULT_SEGMENT_PATHS: usize = 4;

/// Partitions and the index topology built over them.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub partitions: Arc<PartitionSet>,
    pub index: Arc<IndexTopology>,
}

impl Hierarchy {
    pub fn new(partitions: Arc<PartitionSet>, index: Arc<IndexTopology>) -> Self {
        Self { partitions, index }
    }

    /// Build the index topology for `partitions`.
    pub async fn build(partitions: Arc<PartitionSet>) -> Result<Self, PartitionError> {
        let index = IndexTopology::build(Arc::clone(&partitions)).await?;
        Ok(Self::new(partitions, Arc::new(index)))
    }
}

/// A run of consecutive index hops inside one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    partition: PartitionId,
    from: NodeId,
    to: NodeId,
}

fn compress(path: &IndexPath) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for edge in path {
        match segments.last_mut() {
            Some(last) if last.partition == edge.partition => last.to = edge.to,
            _ => segments.push(Segment {
                partition: edge.partition,
                from: edge.from,
                to: edge.to,
            }),
        }
    }
    segments
}

fn is_simple(path: &[NodeId]) -> bool {
    let mut seen = HashSet::with_capacity(path.len());
    path.iter().all(|n| seen.insert(*n))
}

/// Deduplicate, order by hop count (stable) and keep the first `k`.
fn prune(paths: &mut Vec<Path>, k: usize) {
    let mut seen = HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
    paths.sort_by_key(Vec::len);
    paths.truncate(k);
}

/// Hierarchical routing over a [`Hierarchy`].
#[derive(Debug)]
pub struct SegFlow {
    hierarchy: Hierarchy,
    k: usize,
    max_attempts: usize,
    rng: StdRng,
}

impl SegFlow {
    pub fn new(hierarchy: Hierarchy, k: usize, max_attempts: usize, seed: u64) -> Self {
        Self {
            hierarchy,
            k,
            max_attempts,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Real paths for one index path, joined segment by segment and pruned
    /// to the `k` shortest after every join.
    fn expand(&self, index_path: &IndexPath, src: NodeId) -> Result<Vec<Path>, RoutingError> {
        let mut partial: Vec<Path> = vec![vec![src]];
        for segment in compress(index_path) {
            let graph = &self.hierarchy.partitions.get(segment.partition)?.graph;
            let pieces =
                search::k_shortest_simple_paths(graph, segment.from, segment.to, self.k, |_, _| {
                    true
                });

            let mut joined = Vec::new();
            for head in &partial {
                for piece in &pieces {
                    if head.last() != piece.first() {
                        continue;
                    }
                    let mut path = head.clone();
                    path.extend_from_slice(&piece[1..]);
                    if is_simple(&path) {
                        joined.push(path);
                    }
                }
            }
            prune(&mut joined, self.k);
            if joined.is_empty() {
                return Ok(joined);
            }
            partial = joined;
        }
        Ok(partial)
    }

    fn route_intra(
        &self,
        network: &mut CreditNetwork,
        payment: &Payment,
        shared: &BTreeSet<PartitionId>,
        messages: &mut MessageCounts,
    ) -> Result<bool, RoutingError> {
        let subnet = self.hierarchy.partitions.merged_graph(shared)?;
        let probe = probe_with_retries(
            &subnet,
            &*network,
            payment.src,
            payment.dst,
            payment.amount,
            self.max_attempts,
        )?;
        messages.commit += probe.commit_messages;
        match probe.path {
            Ok(path) => {
                let mut attempt = Attempt::begin(network);
                attempt.commit(&path, payment.amount)?;
                attempt.settle();
                Ok(true)
            }
            Err(reason) => {
                tracing::debug!(
                    src = payment.src,
                    dst = payment.dst,
                    %reason,
                    "intra-subnet attempt failed, planning on the index"
                );
                Ok(false)
            }
        }
    }

    fn route_inter(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
        mut messages: MessageCounts,
    ) -> Result<RouteOutcome, RoutingError> {
        let index = self
            .hierarchy
            .index
            .extend_for(&self.hierarchy.partitions, payment.src, payment.dst)?;
        let index_paths =
            k_shortest_index_paths(&index, payment.src, payment.dst, self.k, &mut self.rng);

        let mut collected: Vec<Path> = Vec::new();
        for index_path in &index_paths {
            if let Some(longest) = collected.last() {
                if collected.len() >= self.k && weight(index_path) as u64 >= hops(longest) {
                    break;
                }
            }
            messages.request += compress(index_path).len() as u64;
            collected.extend(self.expand(index_path, payment.src)?);
            prune(&mut collected, self.k);
        }

        if collected.is_empty() {
            tracing::debug!(
                src = payment.src,
                dst = payment.dst,
                index_paths = index_paths.len(),
                "no real path behind the index"
            );
            return Ok(
                RouteOutcome::failed(FailureReason::NoPath, messages)
                    .with_scope(RouteScope::InterSubnet),
            );
        }

        let allowed: HashSet<DirectedEdge> =
            collected.iter().flat_map(|p| path_edges(p)).collect();
        let mut outcome = route_max_flow(network, payment, allowed.len().max(1), Some(&allowed))?;
        outcome.messages += messages;
        Ok(outcome.with_scope(RouteScope::InterSubnet))
    }
}

impl RoutingStrategy for SegFlow {
    fn name(&self) -> &'static str {
        "seg_flow"
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

        let shared = self
            .hierarchy
            .partitions
            .shared_partitions(payment.src, payment.dst);
        if !shared.is_empty() && self.route_intra(network, payment, &shared, &mut messages)? {
            return Ok(RouteOutcome::delivered(payment.amount, messages)
                .with_scope(RouteScope::IntraSubnet));
        }
        self.route_inter(network, payment, messages)
    }
}
