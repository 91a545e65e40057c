//! K shortest paths over the index multigraph.
//!
//! Parallel index edges between the same two boundary nodes are told apart
//! by partition, so a path is a sequence of [`IndexEdge`]s rather than a
//! sequence of nodes.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use pcn_core::NodeId;
use pcn_partition::{ExtendedIndex, IndexEdge, PartitionId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// A route through the index, one edge per hop.
pub(crate) type IndexPath = Vec<IndexEdge>;

type EdgeKey = (NodeId, NodeId, PartitionId);

fn key(edge: &IndexEdge) -> EdgeKey {
    (edge.from, edge.to, edge.partition)
}

/// Sum of edge lengths along `path`.
pub(crate) fn weight(path: &[IndexEdge]) -> usize {
    path.iter().map(|e| e.length).sum()
}

/// Entry in the Dijkstra frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchNode {
    cost: usize,
    node: NodeId,
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost, then on node id.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Lightest path from `src` to `dst` avoiding `banned_nodes` and
/// `banned_edges`.
///
/// Where several usable parallel edges share the minimum length on a hop,
/// one is picked at random.
fn dijkstra(
    index: &ExtendedIndex<'_>,
    src: NodeId,
    dst: NodeId,
    banned_nodes: &HashSet<NodeId>,
    banned_edges: &HashSet<EdgeKey>,
    rng: &mut StdRng,
) -> Option<IndexPath> {
    let usable = |e: &IndexEdge| !banned_nodes.contains(&e.to) && !banned_edges.contains(&key(e));

    let mut dist: HashMap<NodeId, usize> = HashMap::from([(src, 0)]);
    let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap = BinaryHeap::from([SearchNode { cost: 0, node: src }]);

    while let Some(SearchNode { cost, node }) = heap.pop() {
        if node == dst {
            break;
        }
        if dist.get(&node).is_some_and(|&d| cost > d) {
            continue;
        }
        for edge in index.edges_from(node).filter(|e| usable(*e)) {
            let next = cost + edge.length;
            if dist.get(&edge.to).map_or(true, |&d| next < d) {
                dist.insert(edge.to, next);
                prev.insert(edge.to, node);
                heap.push(SearchNode {
                    cost: next,
                    node: edge.to,
                });
            }
        }
    }

    if src != dst && !prev.contains_key(&dst) {
        return None;
    }
    let mut nodes = vec![dst];
    let mut node = dst;
    while node != src {
        node = prev[&node];
        nodes.push(node);
    }
    nodes.reverse();

    let mut path = Vec::with_capacity(nodes.len().saturating_sub(1));
    for pair in nodes.windows(2) {
        let parallel: Vec<&IndexEdge> = index
            .edges_between(pair[0], pair[1])
            .filter(|e| usable(*e))
            .collect();
        let shortest = parallel.iter().map(|e| e.length).min()?;
        let ties: Vec<&IndexEdge> = parallel
            .into_iter()
            .filter(|e| e.length == shortest)
            .collect();
        path.push(**ties.choose(rng)?);
    }
    Some(path)
}

/// Up to `k` lightest loopless index paths from `src` to `dst`, lightest
/// first.
///
/// Deviations from each accepted path ban, at the deviation node, every
/// edge key already used by an accepted path with the same root, plus the
/// root's nodes. Among equally light candidates the earliest found wins.
pub(crate) fn k_shortest_index_paths(
    index: &ExtendedIndex<'_>,
    src: NodeId,
    dst: NodeId,
    k: usize,
    rng: &mut StdRng,
) -> Vec<IndexPath> {
    if k == 0 || src == dst {
        return Vec::new();
    }
    let Some(first) = dijkstra(index, src, dst, &HashSet::new(), &HashSet::new(), rng) else {
        return Vec::new();
    };

    let mut accepted: Vec<IndexPath> = vec![first];
    let mut candidates: Vec<IndexPath> = Vec::new();

    while accepted.len() < k {
        let last = accepted[accepted.len() - 1].clone();
        for j in 0..last.len() {
            let root = &last[..j];
            let spur = root.last().map_or(src, |e| e.to);

            let banned_edges: HashSet<EdgeKey> = accepted
                .iter()
                .filter(|p| p.len() > j && &p[..j] == root)
                .map(|p| key(&p[j]))
                .collect();
            let banned_nodes: HashSet<NodeId> = root.iter().map(|e| e.from).collect();

            if let Some(spur_path) = dijkstra(index, spur, dst, &banned_nodes, &banned_edges, rng) {
                let mut total = root.to_vec();
                total.extend(spur_path);
                if !accepted.contains(&total) && !candidates.contains(&total) {
                    candidates.push(total);
                }
            }
        }

        let Some(best) = candidates
            .iter()
            .enumerate()
            .min_by_key(|(i, p)| (weight(p), *i))
            .map(|(i, _)| i)
        else {
            break;
        };
        accepted.push(candidates.remove(best));
    }
    accepted
}
