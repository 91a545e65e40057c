use pcn_core::{search, CreditNetwork, Payment};

use crate::attempt::Attempt;
use crate::error::RoutingError;
use crate::outcome::{FailureReason, MessageCounts, RouteOutcome};
use crate::strategy::{precheck, RoutingStrategy};
use crate::waterfill::ALLOCATION_TOLERANCE;

/// Single-path baseline: route along the hop-shortest path, ignoring
/// balances while searching.
///
/// `min(capacity, amount)` is committed along the path and rolled back if
/// that falls short of the amount. The capacity is learned by the commit
/// walk itself, so no probe messages are counted; commit messages are
/// counted whether or not the commit is rolled back.
#[derive(Debug, Default)]
pub struct ShortestPath;

impl ShortestPath {
    pub fn new() -> Self {
        Self
    }
}

impl RoutingStrategy for ShortestPath {
    fn name(&self) -> &'static str {
        "shortest_path"
    }

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError> {
        if let Some(outcome) = precheck(network, payment)? {
            return Ok(outcome);
        }
        let mut messages = MessageCounts::default();

        let Some(path) = search::shortest_path(&*network, payment.src, payment.dst, |_, _| true)
        else {
            return Ok(RouteOutcome::failed(FailureReason::NoPath, messages));
        };

        let capacity = network.path_capacity(&path)?;
        let sent = capacity.min(payment.amount).max(0.0);

        let mut attempt = Attempt::begin(network);
        attempt.commit(&path, sent)?;
        messages.commit_path(&path);

        if sent + ALLOCATION_TOLERANCE < payment.amount {
            attempt.rollback()?;
            tracing::debug!(
                src = payment.src,
                dst = payment.dst,
                amount = payment.amount,
                capacity,
                "shortest path too narrow"
            );
            return Ok(RouteOutcome::failed(
                FailureReason::InsufficientCapacity,
                messages,
            ));
        }
        attempt.settle();
        Ok(RouteOutcome::delivered(payment.amount, messages))
    }
}
