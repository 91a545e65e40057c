use crate::partition::PartitionId;

/// Errors raised while partitioning or building the index topology.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("invalid partition config: {0}")]
    InvalidConfig(String),

    #[error("cannot partition an empty graph")]
    EmptyGraph,

    #[error("unknown partition: {0}")]
    UnknownPartition(PartitionId),

    #[error("index build task for partition {partition} failed: {reason}")]
    IndexTask {
        partition: PartitionId,
        reason: String,
    },
}
