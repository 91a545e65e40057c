//! PCN Core — balance graph and graph primitives for payment-channel routing.
//!
//! This crate provides:
//! - [`CreditNetwork`] — an arena of bilateral channels with path-level `apply`.
//! - [`UndirectedGraph`] and the [`Adjacency`] trait shared by every search.
//! - [`search`] — hop-count BFS, distance maps and Yen's k shortest simple paths.
//! - [`ResidualGraph`] — a non-mutating overlay used by augmenting-path search.

pub mod error;
pub mod graph;
pub mod network;
pub mod residual;
pub mod search;
pub mod types;

pub use error::NetworkError;
pub use graph::{Adjacency, UndirectedGraph};
pub use network::{Channel, ChannelId, CreditNetwork};
pub use residual::ResidualGraph;
pub use types::{path_edges, DirectedEdge, NodeId, Path, Payment, BALANCE_EPSILON};
