//! Hop-count graph search over any [`Adjacency`].
//!
//! Every function takes an `edge_ok(from, to)` predicate so callers can mask
//! exhausted, suppressed or out-of-subgraph edges without copying the graph.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::Adjacency;
use crate::types::{NodeId, Path};

/// Shortest path by hop count from `src` to `dst` using only edges accepted
/// by `edge_ok`. Neighbours are explored in adjacency order.
pub fn shortest_path<G, F>(graph: &G, src: NodeId, dst: NodeId, edge_ok: F) -> Option<Path>
where
    G: Adjacency + ?Sized,
    F: Fn(NodeId, NodeId) -> bool,
{
    if !graph.contains_node(src) || !graph.contains_node(dst) {
        return None;
    }
    if src == dst {
        return Some(vec![src]);
    }

    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue = VecDeque::from([src]);
    parent.insert(src, src);

    while let Some(node) = queue.pop_front() {
        for &next in graph.neighbors(node) {
            if parent.contains_key(&next) || !edge_ok(node, next) {
                continue;
            }
            parent.insert(next, node);
            if next == dst {
                return Some(unwind(&parent, src, dst));
            }
            queue.push_back(next);
        }
    }
    None
}

fn unwind(parent: &HashMap<NodeId, NodeId>, src: NodeId, dst: NodeId) -> Path {
    let mut path = vec![dst];
    let mut node = dst;
    while node != src {
        node = parent[&node];
        path.push(node);
    }
    path.reverse();
    path
}

/// Hop distances from `src` to every reachable node.
///
/// Nodes for which `expand` returns `false` still receive a distance but
/// their neighbours are not explored through them. The source is always
/// expanded.
pub fn bfs_distances<G, F>(graph: &G, src: NodeId, expand: F) -> HashMap<NodeId, usize>
where
    G: Adjacency + ?Sized,
    F: Fn(NodeId) -> bool,
{
    let mut dist = HashMap::new();
    if !graph.contains_node(src) {
        return dist;
    }
    dist.insert(src, 0);
    let mut queue = VecDeque::from([src]);
    while let Some(node) = queue.pop_front() {
        if node != src && !expand(node) {
            continue;
        }
        let d = dist[&node];
        for &next in graph.neighbors(node) {
            if !dist.contains_key(&next) {
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

/// Up to `k` shortest simple paths from `src` to `dst`, shortest first
/// (Yen's algorithm with BFS as the spur search).
///
/// Among equally long candidates the one discovered first wins.
pub fn k_shortest_simple_paths<G, F>(
    graph: &G,
    src: NodeId,
    dst: NodeId,
    k: usize,
    edge_ok: F,
) -> Vec<Path>
where
    G: Adjacency + ?Sized,
    F: Fn(NodeId, NodeId) -> bool,
{
    if k == 0 {
        return Vec::new();
    }
    let Some(first) = shortest_path(graph, src, dst, &edge_ok) else {
        return Vec::new();
    };

    let mut accepted: Vec<Path> = vec![first];
    let mut candidates: Vec<Path> = Vec::new();

    while accepted.len() < k {
        let last = accepted[accepted.len() - 1].clone();
        for j in 0..last.len().saturating_sub(1) {
            let spur = last[j];
            let root = &last[..=j];

            let banned_edges: HashSet<(NodeId, NodeId)> = accepted
                .iter()
                .filter(|p| p.len() > j + 1 && &p[..=j] == root)
                .map(|p| (p[j], p[j + 1]))
                .collect();
            let banned_nodes: HashSet<NodeId> = root[..j].iter().copied().collect();

            let spur_path = shortest_path(graph, spur, dst, |u, v| {
                edge_ok(u, v) && !banned_edges.contains(&(u, v)) && !banned_nodes.contains(&v)
            });

            if let Some(spur_path) = spur_path {
                let mut total: Path = root[..j].to_vec();
                total.extend(spur_path);
                if !accepted.contains(&total) && !candidates.contains(&total) {
                    candidates.push(total);
                }
            }
        }

        let Some(best) = candidates
            .iter()
            .enumerate()
            .min_by_key(|(i, p)| (p.len(), *i))
            .map(|(i, _)| i)
        else {
            break;
        };
        accepted.push(candidates.remove(best));
    }

    tracing::trace!(src, dst, k, found = accepted.len(), "k shortest simple paths");
    accepted
}
