use pcn_core::NetworkError;
use pcn_partition::PartitionError;

/// Errors that abort routing outright.
///
/// A payment that simply cannot be delivered is not an error; it comes back
/// as a failed [`RouteOutcome`](crate::RouteOutcome).
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error("invalid payment amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("invalid strategy config: {reason}")]
    InvalidConfig { reason: String },

    #[error("scheme {scheme} requires partitions and an index topology")]
    MissingHierarchy { scheme: &'static str },
}
