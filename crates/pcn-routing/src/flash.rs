use pcn_core::{CreditNetwork, Payment};

use crate::error::RoutingError;
use crate::max_flow::route_max_flow;
use crate::outcome::RouteOutcome;
use crate::path_cache::{route_cached, PathCache};
use crate::strategy::{precheck, RoutingStrategy};

/// Payment size at percentile `p` (0 to 100) of `payments`.
///
/// Sizes are sorted ascending and the entry at `floor(p / 100 * (n - 1))`
/// is returned. An empty list yields `0.0`, which sends every payment down
/// the max-flow branch.
pub fn percentile_threshold(payments: &[Payment], p: f64) -> f64 {
    if payments.is_empty() {
        return 0.0;
    }
    let mut sizes: Vec<f64> = payments.iter().map(|p| p.amount).collect();
    sizes.sort_by(f64::total_cmp);
    let rank = (p.clamp(0.0, 100.0) / 100.0 * (sizes.len() - 1) as f64).floor() as usize;
    sizes[rank.min(sizes.len() - 1)]
}

/// Size-aware dispatcher: mice (below `threshold`) take cached paths with
/// optimistic commits, elephants take max-flow routing.
#[derive(Debug)]
pub struct Flash {
    threshold: f64,
    num_max_cache: usize,
    max_iterations: usize,
    cache: PathCache,
}

impl Flash {
    pub fn new(threshold: f64, num_max_cache: usize, max_iterations: usize) -> Self {
        Self {
            threshold,
            num_max_cache,
            max_iterations,
            cache: PathCache::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }
}

impl RoutingStrategy for Flash {
    fn name(&self) -> &'static str {
        "flash"
    }

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError> {
        if let Some(outcome) = precheck(network, payment)? {
            return Ok(outcome);
        }
        if payment.amount < self.threshold {
            route_cached(&self.cache, network, payment, self.num_max_cache)
        } else {
            route_max_flow(network, payment, self.max_iterations, None)
        }
    }
}
