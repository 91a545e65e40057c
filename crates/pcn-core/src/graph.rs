use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Read access to a graph's neighbour lists.
///
/// Neighbour order is the insertion order of the edges and is part of the
/// deterministic behaviour of every search built on top of it.
pub trait Adjacency {
    /// Neighbours of `node`, or an empty slice if the node is unknown.
    fn neighbors(&self, node: NodeId) -> &[NodeId];

    /// Whether `node` is part of the graph.
    fn contains_node(&self, node: NodeId) -> bool;

    fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }
}

/// A simple undirected graph: each edge is stored once per endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UndirectedGraph {
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
    edge_count: usize,
}

impl UndirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the edge `{a, b}`. Returns `false` if it was already present.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if self.has_edge(a, b) {
            return false;
        }
        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
        self.edge_count += 1;
        true
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|nbrs| nbrs.contains(&b))
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Every edge once, as `(low, high)` pairs in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.adjacency.iter().flat_map(|(&a, nbrs)| {
            nbrs.iter()
                .copied()
                .filter(move |&b| a < b)
                .map(move |b| (a, b))
        })
    }

    /// Merge every node and edge of `other` into `self`.
    pub fn merge(&mut self, other: &UndirectedGraph) {
        for node in other.nodes() {
            self.add_node(node);
        }
        for (a, b) in other.edges() {
            self.add_edge(a, b);
        }
    }

    /// Whether every node is reachable from every other node.
    /// An empty graph is reported as not connected.
    pub fn is_connected(&self) -> bool {
        let Some(start) = self.nodes().next() else {
            return false;
        };
        let mut seen = std::collections::HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in self.neighbors(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.len() == self.node_count()
    }
}

impl Adjacency for UndirectedGraph {
    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    fn contains_node(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_edge_dedup() {
        let mut g = UndirectedGraph::new();
        assert!(g.add_edge(1, 2));
        assert!(!g.add_edge(2, 1));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.degree(1), 1);
    }

    #[test]
    fn test_edges_listed_once() {
        let mut g = UndirectedGraph::new();
        g.add_edge(3, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges, vec![(1, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_merge_and_connectivity() {
        let mut a = UndirectedGraph::new();
        a.add_edge(1, 2);
        let mut b = UndirectedGraph::new();
        b.add_edge(3, 4);
        a.merge(&b);
        assert_eq!(a.edge_count(), 2);
        assert!(!a.is_connected());

        a.add_edge(2, 3);
        assert!(a.is_connected());
        assert!(!UndirectedGraph::new().is_connected());
    }
}
