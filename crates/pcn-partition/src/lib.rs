//! PCN Partition — splits a credit network into overlapping subnets and
//! summarises how the subnets connect.
//!
//! This crate provides:
//! - [`PaymentFrequency`] — who pays whom, used as a locality signal.
//! - [`Partitioner`] — BFS edge partitioning with a replication, load and
//!   locality score.
//! - [`PartitionSet`] — the subnets plus the node → partitions map and the
//!   boundary (cut) node set.
//! - [`IndexTopology`] — the inter-partition multigraph over boundary nodes,
//!   built in parallel and extended per query.

pub mod error;
pub mod frequency;
pub mod index;
pub mod partition;
pub mod partitioner;

pub use error::PartitionError;
pub use frequency::PaymentFrequency;
pub use index::{ExtendedIndex, IndexEdge, IndexStats, IndexTopology};
pub use partition::{BoundaryNode, Partition, PartitionId, PartitionSet, PartitionSummary};
pub use partitioner::{PartitionConfig, Partitioner};
