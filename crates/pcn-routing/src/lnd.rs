use std::collections::HashSet;

use pcn_core::{
    path_edges, search, Adjacency, CreditNetwork, DirectedEdge, NetworkError, NodeId, Path,
    Payment,
};

use crate::attempt::Attempt;
use crate::error::RoutingError;
use crate::outcome::{FailureReason, MessageCounts, RouteOutcome};
use crate::strategy::{precheck, RoutingStrategy};

/// Default number of paths tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Result of the bounded retry search.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RetryProbe {
    /// A path whose every edge can carry the amount, if one was found.
    pub path: Result<Path, FailureReason>,
    /// One message per edge walked, across all attempts.
    pub commit_messages: u64,
}

/// Walk hop-shortest paths of `topology` the way an LND sender does.
///
/// Each attempt takes the shortest path avoiding previously failed edges and
/// walks it hop by hop, one commit message per hop, stopping at the first
/// edge whose live balance is below `amount`. That edge is excluded and the
/// next attempt starts over. Balances are read from `network`, never
/// changed.
pub(crate) fn probe_with_retries<G>(
    topology: &G,
    network: &CreditNetwork,
    src: NodeId,
    dst: NodeId,
    amount: f64,
    max_attempts: usize,
) -> Result<RetryProbe, NetworkError>
where
    G: Adjacency + ?Sized,
{
    let mut failed: HashSet<DirectedEdge> = HashSet::new();
    let mut commit_messages = 0;

    for attempt in 0..max_attempts {
        let Some(path) =
            search::shortest_path(topology, src, dst, |u, v| !failed.contains(&(u, v)))
        else {
            return Ok(RetryProbe {
                path: Err(FailureReason::NoPath),
                commit_messages,
            });
        };

        let mut blocked = None;
        for (from, to) in path_edges(&path) {
            commit_messages += 1;
            if network.balance(from, to)? < amount {
                blocked = Some((from, to));
                break;
            }
        }

        match blocked {
            None => {
                return Ok(RetryProbe {
                    path: Ok(path),
                    commit_messages,
                })
            }
            Some(edge) => {
                tracing::trace!(attempt, from = edge.0, to = edge.1, "edge lacks balance, retrying");
                failed.insert(edge);
            }
        }
    }

    Ok(RetryProbe {
        path: Err(FailureReason::RetriesExhausted),
        commit_messages,
    })
}

/// LND-style source routing with a bounded number of retries.
///
/// Capacity is discovered while committing, so every hop walked counts as a
/// commit message and no probe messages are sent.
#[derive(Debug)]
pub struct Lnd {
    max_attempts: usize,
}

impl Lnd {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }
}

impl Default for Lnd {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RoutingStrategy for Lnd {
    fn name(&self) -> &'static str {
        "lnd"
    }

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError> {
        if let Some(outcome) = precheck(network, payment)? {
            return Ok(outcome);
        }

        let probe = probe_with_retries(
            &*network,
            &*network,
            payment.src,
            payment.dst,
            payment.amount,
            self.max_attempts,
        )?;
        let messages = MessageCounts {
            commit: probe.commit_messages,
            ..MessageCounts::default()
        };

        match probe.path {
            Ok(path) => {
                let mut attempt = Attempt::begin(network);
                attempt.commit(&path, payment.amount)?;
                attempt.settle();
                Ok(RouteOutcome::delivered(payment.amount, messages))
            }
            Err(reason) => {
                tracing::debug!(src = payment.src, dst = payment.dst, %reason, "lnd payment failed");
                Ok(RouteOutcome::failed(reason, messages))
            }
        }
    }
}
