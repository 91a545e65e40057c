//! The index topology: a directed multigraph over boundary nodes.
//!
//! An edge `u -> v` labelled with partition `p` and length `l` records that
//! `u` reaches `v` inside `p` in `l` hops along a shortest path that touches
//! no other boundary node. Routes that cross partitions are planned on this
//! graph first and expanded into real channels afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use pcn_core::search::bfs_distances;
use pcn_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::PartitionError;
use crate::partition::{PartitionId, PartitionSet};

/// One directed edge of the index topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEdge {
    pub from: NodeId,
    pub to: NodeId,
    /// Hop length of the shortest path inside `partition`.
    pub length: usize,
    pub partition: PartitionId,
}

/// Summary numbers for an index topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub nodes: usize,
    pub edges: usize,
    /// Distinct `(from, to)` pairs, ignoring parallel edges.
    pub distinct_pairs: usize,
    pub mean_length: f64,
}

/// The merged index multigraph for a whole [`PartitionSet`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexTopology {
    outgoing: BTreeMap<NodeId, Vec<IndexEdge>>,
    nodes: BTreeSet<NodeId>,
    edge_count: usize,
}

impl IndexTopology {
    /// Build the index with one blocking task per partition.
    ///
    /// Partitions share nothing while they are processed; the results are
    /// merged in partition-id order whatever order the tasks finish in.
    pub async fn build(partitions: Arc<PartitionSet>) -> Result<Self, PartitionError> {
        let handles: Vec<_> = (0..partitions.len())
            .map(|id| {
                let partitions = Arc::clone(&partitions);
                (
                    id,
                    tokio::task::spawn_blocking(move || partition_index_edges(&partitions, id)),
                )
            })
            .collect();

        let mut per_partition: BTreeMap<PartitionId, Vec<IndexEdge>> = BTreeMap::new();
        for (id, handle) in handles {
            let edges = handle.await.map_err(|e| PartitionError::IndexTask {
                partition: id,
                reason: e.to_string(),
            })??;
            tracing::debug!(partition = id, edges = edges.len(), "partition indexed");
            per_partition.insert(id, edges);
        }

        let index = Self::from_edges(per_partition.into_values().flatten());
        let stats = index.stats();
        tracing::info!(
            nodes = stats.nodes,
            edges = stats.edges,
            pairs = stats.distinct_pairs,
            mean_length = stats.mean_length,
            "index topology built"
        );
        Ok(index)
    }

    /// Assemble an index from explicit edges, keeping their order.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = IndexEdge>,
    {
        let mut index = Self::default();
        for edge in edges {
            index.insert(edge);
        }
        index
    }

    fn insert(&mut self, edge: IndexEdge) {
        self.nodes.insert(edge.from);
        self.nodes.insert(edge.to);
        self.outgoing.entry(edge.from).or_default().push(edge);
        self.edge_count += 1;
    }

    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Outgoing edges of `node`, parallel edges included.
    pub fn edges_from(&self, node: NodeId) -> &[IndexEdge] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges(&self) -> impl Iterator<Item = &IndexEdge> + '_ {
        self.outgoing.values().flatten()
    }

    pub fn stats(&self) -> IndexStats {
        let pairs: HashSet<(NodeId, NodeId)> = self.edges().map(|e| (e.from, e.to)).collect();
        let total: usize = self.edges().map(|e| e.length).sum();
        IndexStats {
            nodes: self.nodes.len(),
            edges: self.edge_count,
            distinct_pairs: pairs.len(),
            mean_length: if self.edge_count == 0 {
                0.0
            } else {
                total as f64 / self.edge_count as f64
            },
        }
    }

    /// Overlay query-specific edges for a payment from `src` to `dst`.
    ///
    /// An endpoint that lives in exactly one partition is wired to every
    /// boundary node of that partition it can reach, weighted by hop
    /// distance. Endpoints in several partitions are boundary nodes already
    /// and get no extra edges.
    pub fn extend_for(
        &self,
        partitions: &PartitionSet,
        src: NodeId,
        dst: NodeId,
    ) -> Result<ExtendedIndex<'_>, PartitionError> {
        let mut extended = ExtendedIndex::plain(self);

        if let Some(id) = single_partition(partitions, src) {
            for (boundary, length) in boundary_distances(partitions, id, src)? {
                extended.add(IndexEdge {
                    from: src,
                    to: boundary,
                    length,
                    partition: id,
                });
            }
        }
        if let Some(id) = single_partition(partitions, dst) {
            for (boundary, length) in boundary_distances(partitions, id, dst)? {
                extended.add(IndexEdge {
                    from: boundary,
                    to: dst,
                    length,
                    partition: id,
                });
            }
        }
        Ok(extended)
    }
}

fn single_partition(partitions: &PartitionSet, node: NodeId) -> Option<PartitionId> {
    let ids = partitions.partitions_of(node);
    match (ids.len(), ids.first()) {
        (1, Some(&id)) => Some(id),
        _ => None,
    }
}

/// Hop distance from `node` to each reachable boundary node of partition `id`.
fn boundary_distances(
    partitions: &PartitionSet,
    id: PartitionId,
    node: NodeId,
) -> Result<Vec<(NodeId, usize)>, PartitionError> {
    let graph = &partitions.get(id)?.graph;
    let dist = bfs_distances(graph, node, |_| true);
    Ok(partitions
        .boundary_nodes_in(id)?
        .into_iter()
        .filter(|&b| b != node)
        .filter_map(|b| dist.get(&b).map(|&d| (b, d)))
        .collect())
}

/// Index edges contributed by partition `id`.
///
/// For each pair of boundary nodes the distance in the partition is compared
/// with the distance found when other boundary nodes may be reached but not
/// passed through. Equal distances mean at least one shortest path avoids
/// every other boundary node, so the pair gets an edge in both directions.
fn partition_index_edges(
    partitions: &PartitionSet,
    id: PartitionId,
) -> Result<Vec<IndexEdge>, PartitionError> {
    let graph = &partitions.get(id)?.graph;
    let boundary: Vec<NodeId> = partitions.boundary_nodes_in(id)?.into_iter().collect();
    let is_boundary: HashSet<NodeId> = boundary.iter().copied().collect();

    let mut edges = Vec::new();
    for (i, &u) in boundary.iter().enumerate() {
        let full = bfs_distances(graph, u, |_| true);
        let clear = bfs_distances(graph, u, |n| !is_boundary.contains(&n));
        for &v in &boundary[i + 1..] {
            match (full.get(&v), clear.get(&v)) {
                (Some(&d), Some(&c)) if d == c => {
                    edges.push(IndexEdge {
                        from: u,
                        to: v,
                        length: d,
                        partition: id,
                    });
                    edges.push(IndexEdge {
                        from: v,
                        to: u,
                        length: d,
                        partition: id,
                    });
                }
                _ => {}
            }
        }
    }
    tracing::trace!(partition = id, boundary = boundary.len(), "boundary pairs scanned");
    Ok(edges)
}

/// An [`IndexTopology`] plus per-query edges, without copying the base.
#[derive(Debug, Clone)]
pub struct ExtendedIndex<'a> {
    base: &'a IndexTopology,
    extra: BTreeMap<NodeId, Vec<IndexEdge>>,
}

impl<'a> ExtendedIndex<'a> {
    /// The base index with nothing added.
    pub fn plain(base: &'a IndexTopology) -> Self {
        Self {
            base,
            extra: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, edge: IndexEdge) {
        self.extra.entry(edge.from).or_default().push(edge);
    }

    pub fn base(&self) -> &'a IndexTopology {
        self.base
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.base.contains_node(node)
            || self.extra.contains_key(&node)
            || self.extra.values().flatten().any(|e| e.to == node)
    }

    /// Outgoing edges of `node`: base edges first, then query edges.
    pub fn edges_from(&self, node: NodeId) -> impl Iterator<Item = &IndexEdge> + '_ {
        self.base
            .edges_from(node)
            .iter()
            .chain(self.extra.get(&node).into_iter().flatten())
    }

    /// Every parallel edge from `from` to `to`.
    pub fn edges_between(&self, from: NodeId, to: NodeId) -> impl Iterator<Item = &IndexEdge> + '_ {
        self.edges_from(from).filter(move |e| e.to == to)
    }

    /// Number of query edges added on top of the base.
    pub fn extra_edge_count(&self) -> usize {
        self.extra.values().map(Vec::len).sum()
    }
}
