use crate::types::NodeId;

/// Errors raised by the credit network and graph primitives.
///
/// These signal a caller supplying ids or paths that do not exist in the
/// current graph. They are never used to report a routing failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    #[error("no such node: {0}")]
    NoSuchNode(NodeId),

    #[error("no such edge: {from} -> {to}")]
    NoSuchEdge { from: NodeId, to: NodeId },

    #[error("self-loop channel on node {0}")]
    SelfLoop(NodeId),

    #[error("channel {a} <-> {b} already exists")]
    DuplicateChannel { a: NodeId, b: NodeId },

    #[error("negative balance {balance} on {from} -> {to}")]
    NegativeBalance { from: NodeId, to: NodeId, balance: f64 },

    #[error("invalid path: {reason}")]
    InvalidPath { reason: String },
}
