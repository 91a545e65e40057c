use std::ops::AddAssign;

use pcn_core::NodeId;
use serde::{Deserialize, Serialize};

/// Protocol message counters for one payment or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounts {
    /// Read-only capacity checks, one per edge.
    pub probe: u64,
    /// Balance-mutating messages, one per edge.
    pub commit: u64,
    /// Sub-route requests sent across partitions, one per index segment.
    pub request: u64,
}

impl MessageCounts {
    pub fn probe_path(&mut self, path: &[NodeId]) {
        self.probe += hops(path);
    }

    pub fn commit_path(&mut self, path: &[NodeId]) {
        self.commit += hops(path);
    }
}

impl AddAssign for MessageCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.probe += rhs.probe;
        self.commit += rhs.commit;
        self.request += rhs.request;
    }
}

/// Number of edges on a node path.
pub(crate) fn hops(path: &[NodeId]) -> u64 {
    path.len().saturating_sub(1) as u64
}

/// Why a payment was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// No path connects source and destination.
    NoPath,
    /// Paths exist but their probed capacity is below the amount.
    InsufficientCapacity,
    /// The bounded retry loop ran out of attempts.
    RetriesExhausted,
    /// Greedy forwarding reached a node with no closer neighbour able to
    /// carry the share.
    NoForwardingCandidate,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPath => write!(f, "no path"),
            Self::InsufficientCapacity => write!(f, "insufficient capacity"),
            Self::RetriesExhausted => write!(f, "retries exhausted"),
            Self::NoForwardingCandidate => write!(f, "no forwarding candidate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    Delivered,
    Failed(FailureReason),
}

/// Where a hierarchical payment was resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteScope {
    /// Flat routing over the whole network.
    #[default]
    Network,
    /// Inside the union of partitions shared by both endpoints.
    IntraSubnet,
    /// Across partitions through the index topology.
    InterSubnet,
}

/// Result of routing a single payment.
///
/// `sent` is either the full amount or zero; failed attempts have already
/// been rolled back when this value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub sent: f64,
    pub status: RouteStatus,
    pub messages: MessageCounts,
    pub scope: RouteScope,
}

impl RouteOutcome {
    pub fn delivered(amount: f64, messages: MessageCounts) -> Self {
        Self {
            sent: amount,
            status: RouteStatus::Delivered,
            messages,
            scope: RouteScope::Network,
        }
    }

    pub fn failed(reason: FailureReason, messages: MessageCounts) -> Self {
        Self {
            sent: 0.0,
            status: RouteStatus::Failed(reason),
            messages,
            scope: RouteScope::Network,
        }
    }

    /// A payment that needs no movement of funds.
    pub fn trivial(amount: f64) -> Self {
        Self::delivered(amount, MessageCounts::default())
    }

    pub fn with_scope(mut self, scope: RouteScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn is_delivered(&self) -> bool {
        self.status == RouteStatus::Delivered
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self.status {
            RouteStatus::Delivered => None,
            RouteStatus::Failed(reason) => Some(reason),
        }
    }
}
