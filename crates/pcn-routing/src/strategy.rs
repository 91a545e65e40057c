use pcn_core::{CreditNetwork, Payment};

use crate::error::RoutingError;
use crate::outcome::RouteOutcome;

/// A routing scheme.
///
/// `route` either moves the full amount or leaves every balance exactly as
/// it found it. Implementations may keep state between payments (path
/// caches, landmark embeddings, a seeded RNG), which is why they take
/// `&mut self`.
pub trait RoutingStrategy {
    /// Short scheme name used in logs and reports.
    fn name(&self) -> &'static str;

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError>;
}

/// Checks shared by every strategy: the amount must be a finite
/// non-negative number and both endpoints must exist. Returns the outcome
/// directly for payments that need no routing.
pub(crate) fn precheck(
    network: &CreditNetwork,
    payment: &Payment,
) -> Result<Option<RouteOutcome>, RoutingError> {
    if !payment.amount.is_finite() || payment.amount < 0.0 {
        return Err(RoutingError::InvalidAmount {
            amount: payment.amount,
        });
    }
    network.ensure_node(payment.src)?;
    network.ensure_node(payment.dst)?;
    if payment.is_trivial() {
        return Ok(Some(RouteOutcome::trivial(payment.amount)));
    }
    Ok(None)
}
