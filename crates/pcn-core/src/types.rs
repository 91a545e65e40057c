use serde::{Deserialize, Serialize};

/// Integer node identifier.
pub type NodeId = u32;

/// A walk through the network, listed node by node from source to target.
pub type Path = Vec<NodeId>;

/// A directed edge `(from, to)`.
pub type DirectedEdge = (NodeId, NodeId);

/// Balances at or below this value are treated as exhausted.
pub const BALANCE_EPSILON: f64 = 1e-9;

/// A payment request: move `amount` from `src` to `dst`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub src: NodeId,
    pub dst: NodeId,
    pub amount: f64,
}

impl Payment {
    pub fn new(src: NodeId, dst: NodeId, amount: f64) -> Self {
        Self { src, dst, amount }
    }

    /// True when the payment needs no movement of funds at all.
    pub fn is_trivial(&self) -> bool {
        self.src == self.dst || self.amount == 0.0
    }
}

impl From<(NodeId, NodeId, f64)> for Payment {
    fn from((src, dst, amount): (NodeId, NodeId, f64)) -> Self {
        Self { src, dst, amount }
    }
}

/// Iterate over the directed edges of a node path.
pub fn path_edges(path: &[NodeId]) -> impl Iterator<Item = DirectedEdge> + '_ {
    path.windows(2).map(|w| (w[0], w[1]))
}
