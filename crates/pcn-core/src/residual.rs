use std::collections::{HashMap, HashSet};

use crate::error::NetworkError;
use crate::network::CreditNetwork;
use crate::search;
use crate::types::{path_edges, DirectedEdge, NodeId, Path, BALANCE_EPSILON};

/// A residual view over a [`CreditNetwork`] that never mutates it.
///
/// Probing pushes flow into a sparse delta table and may suppress directed
/// edges outright. Both are discarded with the overlay, so the shared
/// network is left exactly as it was.
#[derive(Debug)]
pub struct ResidualGraph<'a> {
    network: &'a CreditNetwork,
    delta: HashMap<DirectedEdge, f64>,
    suppressed: HashSet<DirectedEdge>,
    log: Vec<(Path, f64)>,
}

impl<'a> ResidualGraph<'a> {
    pub fn new(network: &'a CreditNetwork) -> Self {
        Self {
            network,
            delta: HashMap::new(),
            suppressed: HashSet::new(),
            log: Vec::new(),
        }
    }

    pub fn network(&self) -> &'a CreditNetwork {
        self.network
    }

    /// Residual balance of `from -> to`.
    pub fn balance(&self, from: NodeId, to: NodeId) -> Result<f64, NetworkError> {
        let base = self.network.balance(from, to)?;
        Ok(base + self.delta.get(&(from, to)).copied().unwrap_or(0.0))
    }

    /// Whether the directed edge can carry more flow in this overlay.
    pub fn is_usable(&self, from: NodeId, to: NodeId) -> bool {
        !self.suppressed.contains(&(from, to))
            && self
                .balance(from, to)
                .is_ok_and(|b| b > BALANCE_EPSILON)
    }

    /// Hide `from -> to` from subsequent searches regardless of balance.
    pub fn suppress(&mut self, from: NodeId, to: NodeId) {
        self.suppressed.insert((from, to));
    }

    pub fn is_suppressed(&self, from: NodeId, to: NodeId) -> bool {
        self.suppressed.contains(&(from, to))
    }

    /// Minimum residual balance along `path`.
    pub fn path_capacity(&self, path: &[NodeId]) -> Result<f64, NetworkError> {
        let mut capacity = f64::INFINITY;
        for (from, to) in path_edges(path) {
            capacity = capacity.min(self.balance(from, to)?);
        }
        Ok(capacity)
    }

    /// Push `amount` of residual flow along `path`: debit forward edges,
    /// credit reverse edges.
    pub fn push(&mut self, path: &[NodeId], amount: f64) -> Result<(), NetworkError> {
        for (from, to) in path_edges(path) {
            if !self.network.has_edge(from, to) {
                return Err(NetworkError::NoSuchEdge { from, to });
            }
        }
        for (from, to) in path_edges(path) {
            *self.delta.entry((from, to)).or_insert(0.0) -= amount;
            *self.delta.entry((to, from)).or_insert(0.0) += amount;
        }
        self.log.push((path.to_vec(), amount));
        Ok(())
    }

    /// Every push so far, in order.
    pub fn pushes(&self) -> &[(Path, f64)] {
        &self.log
    }

    /// Drop every push and lift all suppressions.
    pub fn reset(&mut self) {
        self.log.clear();
        self.delta.clear();
        self.suppressed.clear();
    }

    /// Hop-shortest path over edges that still carry residual balance and
    /// pass the extra `edge_ok` filter.
    pub fn shortest_path<F>(&self, src: NodeId, dst: NodeId, edge_ok: F) -> Option<Path>
    where
        F: Fn(NodeId, NodeId) -> bool,
    {
        search::shortest_path(self.network, src, dst, |u, v| {
            self.is_usable(u, v) && edge_ok(u, v)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> CreditNetwork {
        let mut net = CreditNetwork::new();
        for (a, b) in [(0, 1), (1, 3), (0, 2), (2, 3)] {
            net.add_channel(a, b, 10.0, 10.0).unwrap();
        }
        net
    }

    #[test]
    fn test_push_is_local_to_overlay() {
        let net = diamond();
        let mut residual = ResidualGraph::new(&net);
        residual.push(&[0, 1, 3], 10.0).unwrap();

        assert_eq!(residual.balance(0, 1).unwrap(), 0.0);
        assert_eq!(residual.balance(1, 0).unwrap(), 20.0);
        assert!(!residual.is_usable(0, 1));
        assert_eq!(net.balance(0, 1).unwrap(), 10.0);
    }

    #[test]
    fn test_exhausted_edges_are_skipped() {
        let net = diamond();
        let mut residual = ResidualGraph::new(&net);
        residual.push(&[0, 1, 3], 10.0).unwrap();
        assert_eq!(residual.shortest_path(0, 3, |_, _| true), Some(vec![0, 2, 3]));
        residual.push(&[0, 2, 3], 10.0).unwrap();
        assert_eq!(residual.shortest_path(0, 3, |_, _| true), None);
    }

    #[test]
    fn test_suppress_and_reset() {
        let net = diamond();
        let mut residual = ResidualGraph::new(&net);
        residual.suppress(0, 1);
        residual.push(&[0, 2], 4.0).unwrap();
        assert_eq!(residual.shortest_path(0, 3, |_, _| true), Some(vec![0, 2, 3]));

        residual.reset();
        assert!(!residual.is_suppressed(0, 1));
        assert_eq!(residual.balance(0, 2).unwrap(), 10.0);
        assert_eq!(residual.shortest_path(0, 3, |_, _| true), Some(vec![0, 1, 3]));
    }

    #[test]
    fn test_push_unknown_edge() {
        let net = diamond();
        let mut residual = ResidualGraph::new(&net);
        assert!(residual.push(&[0, 3], 1.0).is_err());
        assert_eq!(residual.balance(0, 1).unwrap(), 10.0);
    }
}
