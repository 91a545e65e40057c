//! Streaming edge partitioner.
//!
//! Edges are visited once in BFS order from the highest-degree node and each
//! one is placed in the partition with the best score. The score rewards
//! partitions that already hold an endpoint (favouring the low-degree one so
//! hubs are replicated instead of leaves), partitions with few nodes, and
//! partitions holding the endpoints' frequent payment partners.

use std::collections::{HashSet, VecDeque};

use pcn_core::{Adjacency, CreditNetwork, NodeId, UndirectedGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::PartitionError;
use crate::frequency::PaymentFrequency;
use crate::partition::PartitionSet;

/// Scores closer than this are treated as ties.
const SCORE_TIE: f64 = 1e-12;
const NORMALIZE_EPSILON: f64 = 1e-9;

/// Partitioner parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Number of partitions `n`.
    #[serde(default = "default_num_partitions")]
    pub num_partitions: usize,

    /// Weight of the load-balancing term.
    #[serde(default = "default_balance_lambda")]
    pub balance_lambda: f64,

    /// Weight of the payment-locality term.
    #[serde(default)]
    pub payment_lambda: f64,

    /// Seed for tie-breaking between equally scored partitions.
    #[serde(default)]
    pub seed: u64,
}

fn default_num_partitions() -> usize {
    10
}

fn default_balance_lambda() -> f64 {
    1.1
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            num_partitions: default_num_partitions(),
            balance_lambda: default_balance_lambda(),
            payment_lambda: 0.0,
            seed: 0,
        }
    }
}

impl PartitionConfig {
    pub fn validate(&self) -> Result<(), PartitionError> {
        if self.num_partitions == 0 {
            return Err(PartitionError::InvalidConfig(
                "num_partitions must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("balance_lambda", self.balance_lambda),
            ("payment_lambda", self.payment_lambda),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PartitionError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Splits a network into `n` edge-disjoint, possibly node-overlapping
/// subgraphs.
pub struct Partitioner {
    config: PartitionConfig,
    rng: StdRng,
}

impl Partitioner {
    pub fn new(config: PartitionConfig) -> Result<Self, PartitionError> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Partition the undirected projection of `network`.
    pub fn partition(
        &mut self,
        network: &CreditNetwork,
        frequency: &PaymentFrequency,
    ) -> Result<PartitionSet, PartitionError> {
        self.partition_graph(&network.to_undirected(), frequency)
    }

    /// Partition an undirected graph directly.
    pub fn partition_graph(
        &mut self,
        graph: &UndirectedGraph,
        frequency: &PaymentFrequency,
    ) -> Result<PartitionSet, PartitionError> {
        if graph.is_empty() {
            return Err(PartitionError::EmptyGraph);
        }

        let mut parts = vec![UndirectedGraph::new(); self.config.num_partitions];
        let mut visited_nodes: HashSet<NodeId> = HashSet::new();
        let mut visited_edges: HashSet<(NodeId, NodeId)> = HashSet::new();

        while let Some(start) = highest_degree_unvisited(graph, &visited_nodes) {
            tracing::trace!(start, "partition traversal started");
            visited_nodes.insert(start);
            let mut queue = VecDeque::from([start]);

            while let Some(node) = queue.pop_front() {
                for &nbr in graph.neighbors(node) {
                    let edge = if node < nbr { (node, nbr) } else { (nbr, node) };
                    if !visited_edges.insert(edge) {
                        continue;
                    }
                    let chosen = self.choose_partition(graph, edge, &parts, frequency);
                    parts[chosen].add_edge(edge.0, edge.1);

                    if visited_nodes.insert(nbr) {
                        queue.push_back(nbr);
                    }
                }
            }
        }

        // Isolated nodes carry no edge; give each one a home so every node
        // belongs to some partition.
        for node in graph.nodes().filter(|&n| graph.degree(n) == 0) {
            let smallest = (0..parts.len())
                .min_by_key(|&i| parts[i].node_count())
                .unwrap_or(0);
            parts[smallest].add_node(node);
        }

        for (id, part) in parts.iter().enumerate() {
            if part.is_empty() {
                tracing::warn!(partition = id, "partition left empty");
            }
        }

        let set = PartitionSet::from_graphs(parts);
        tracing::debug!(
            partitions = set.len(),
            boundary = set.boundary_nodes().len(),
            edges = graph.edge_count(),
            "network partitioned"
        );
        Ok(set)
    }

    fn choose_partition(
        &mut self,
        graph: &UndirectedGraph,
        (src, dst): (NodeId, NodeId),
        parts: &[UndirectedGraph],
        frequency: &PaymentFrequency,
    ) -> usize {
        let loads: Vec<usize> = parts.iter().map(UndirectedGraph::node_count).collect();
        let max_load = loads.iter().copied().max().unwrap_or(0) as f64;
        let min_load = loads.iter().copied().min().unwrap_or(0) as f64;

        let affinity: Vec<f64> = parts
            .iter()
            .map(|part| {
                frequency
                    .partners(src)
                    .chain(frequency.partners(dst))
                    .filter(|&(n, _)| part.contains_node(n))
                    .map(|(_, count)| count as f64)
                    .sum()
            })
            .collect();
        let max_affinity = affinity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_affinity = affinity.iter().copied().fold(f64::INFINITY, f64::min);

        let degree_src = graph.degree(src) as f64;
        let degree_dst = graph.degree(dst) as f64;
        let theta_src = degree_src / (degree_src + degree_dst);
        let theta_dst = degree_dst / (degree_src + degree_dst);

        let mut best = f64::NEG_INFINITY;
        let mut candidates: Vec<usize> = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            let mut replication = 0.0;
            if part.contains_node(src) {
                replication += 2.0 - theta_src;
            }
            if part.contains_node(dst) {
                replication += 2.0 - theta_dst;
            }
            let load = self.config.balance_lambda * (max_load - loads[i] as f64)
                / (max_load - min_load + NORMALIZE_EPSILON);
            let locality = self.config.payment_lambda * (affinity[i] - min_affinity)
                / (max_affinity - min_affinity + NORMALIZE_EPSILON);
            let score = replication + load + locality;

            if score > best + SCORE_TIE {
                best = score;
                candidates.clear();
                candidates.push(i);
            } else if (score - best).abs() <= SCORE_TIE {
                candidates.push(i);
            }
        }

        candidates.choose(&mut self.rng).copied().unwrap_or(0)
    }
}

/// The unvisited node with the highest degree, lowest id first among equals.
fn highest_degree_unvisited(graph: &UndirectedGraph, visited: &HashSet<NodeId>) -> Option<NodeId> {
    graph
        .nodes()
        .filter(|n| !visited.contains(n) && graph.degree(*n) > 0)
        .fold(None, |best: Option<NodeId>, n| match best {
            Some(b) if graph.degree(b) >= graph.degree(n) => Some(b),
            _ => Some(n),
        })
}
