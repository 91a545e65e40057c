use std::collections::{BTreeMap, BTreeSet};

use pcn_core::{Adjacency, CreditNetwork, NodeId, Payment, UndirectedGraph};
use serde::{Deserialize, Serialize};

use crate::error::PartitionError;

/// Index of a partition, in `[0, n)`.
pub type PartitionId = usize;

/// One subnet produced by the partitioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub id: PartitionId,
    pub graph: UndirectedGraph,
}

/// Size report for one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub id: PartitionId,
    pub node_count: usize,
    pub edge_count: usize,
    pub connected: bool,
}

/// A node shared by several partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryNode {
    pub node: NodeId,
    pub degree: usize,
    pub partition_count: usize,
}

/// The partitions of one network together with the derived membership map.
///
/// Boundary nodes are computed once when the set is built and looked up by
/// membership afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSet {
    partitions: Vec<Partition>,
    memberships: BTreeMap<NodeId, BTreeSet<PartitionId>>,
    boundary: BTreeSet<NodeId>,
}

impl PartitionSet {
    /// Wrap subgraphs as partitions `0..n` and derive memberships.
    pub fn from_graphs(graphs: Vec<UndirectedGraph>) -> Self {
        let partitions: Vec<Partition> = graphs
            .into_iter()
            .enumerate()
            .map(|(id, graph)| Partition { id, graph })
            .collect();

        let mut memberships: BTreeMap<NodeId, BTreeSet<PartitionId>> = BTreeMap::new();
        for partition in &partitions {
            for node in partition.graph.nodes() {
                memberships.entry(node).or_default().insert(partition.id);
            }
        }
        let boundary = memberships
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(&node, _)| node)
            .collect();

        Self {
            partitions,
            memberships,
            boundary,
        }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn get(&self, id: PartitionId) -> Result<&Partition, PartitionError> {
        self.partitions
            .get(id)
            .ok_or(PartitionError::UnknownPartition(id))
    }

    /// Partitions containing `node`; empty for unknown nodes.
    pub fn partitions_of(&self, node: NodeId) -> BTreeSet<PartitionId> {
        self.memberships.get(&node).cloned().unwrap_or_default()
    }

    /// Partitions containing both `a` and `b`.
    pub fn shared_partitions(&self, a: NodeId, b: NodeId) -> BTreeSet<PartitionId> {
        match (self.memberships.get(&a), self.memberships.get(&b)) {
            (Some(pa), Some(pb)) => pa.intersection(pb).copied().collect(),
            _ => BTreeSet::new(),
        }
    }

    /// The node → partition-ids map.
    pub fn memberships(&self) -> &BTreeMap<NodeId, BTreeSet<PartitionId>> {
        &self.memberships
    }

    pub fn is_boundary(&self, node: NodeId) -> bool {
        self.boundary.contains(&node)
    }

    pub fn boundary_nodes(&self) -> &BTreeSet<NodeId> {
        &self.boundary
    }

    /// Boundary nodes that belong to partition `id`.
    pub fn boundary_nodes_in(&self, id: PartitionId) -> Result<BTreeSet<NodeId>, PartitionError> {
        let partition = self.get(id)?;
        Ok(partition
            .graph
            .nodes()
            .filter(|n| self.boundary.contains(n))
            .collect())
    }

    /// Union of the given partitions as one graph.
    pub fn merged_graph<'a, I>(&self, ids: I) -> Result<UndirectedGraph, PartitionError>
    where
        I: IntoIterator<Item = &'a PartitionId>,
    {
        let mut merged = UndirectedGraph::new();
        for &id in ids {
            merged.merge(&self.get(id)?.graph);
        }
        Ok(merged)
    }

    pub fn summaries(&self) -> Vec<PartitionSummary> {
        self.partitions
            .iter()
            .map(|p| PartitionSummary {
                id: p.id,
                node_count: p.graph.node_count(),
                edge_count: p.graph.edge_count(),
                connected: p.graph.is_connected(),
            })
            .collect()
    }

    /// How many nodes live in exactly `r` partitions, keyed by `r`.
    pub fn replication_distribution(&self) -> BTreeMap<usize, usize> {
        let mut dist = BTreeMap::new();
        for ids in self.memberships.values() {
            *dist.entry(ids.len()).or_insert(0) += 1;
        }
        dist
    }

    /// Share of payments whose endpoints have a partition in common.
    pub fn intra_partition_ratio(&self, payments: &[Payment]) -> f64 {
        if payments.is_empty() {
            return 0.0;
        }
        let intra = payments
            .iter()
            .filter(|p| !self.shared_partitions(p.src, p.dst).is_empty())
            .count();
        intra as f64 / payments.len() as f64
    }

    /// Boundary nodes with their network degree, most replicated first.
    pub fn boundary_report(&self, network: &CreditNetwork) -> Vec<BoundaryNode> {
        let mut report: Vec<BoundaryNode> = self
            .boundary
            .iter()
            .map(|&node| BoundaryNode {
                node,
                degree: network.degree(node),
                partition_count: self.memberships.get(&node).map_or(0, BTreeSet::len),
            })
            .collect();
        report.sort_by(|a, b| b.partition_count.cmp(&a.partition_count));
        report
    }
}
