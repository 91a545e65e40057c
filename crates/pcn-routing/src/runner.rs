use pcn_core::{CreditNetwork, Payment};
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::outcome::{RouteOutcome, RouteScope};
use crate::strategy::RoutingStrategy;

/// Aggregate results of routing a payment sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub attempted: usize,
    pub delivered: usize,
    /// Total value delivered.
    pub throughput: f64,
    pub probe_messages: u64,
    pub commit_messages: u64,
    pub request_messages: u64,
    /// Payments delivered inside a shared partition.
    pub subnet_delivered: usize,
    pub subnet_throughput: f64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &RouteOutcome) {
        self.attempted += 1;
        self.probe_messages += outcome.messages.probe;
        self.commit_messages += outcome.messages.commit;
        self.request_messages += outcome.messages.request;
        if outcome.is_delivered() {
            self.delivered += 1;
            self.throughput += outcome.sent;
            if outcome.scope == RouteScope::IntraSubnet {
                self.subnet_delivered += 1;
                self.subnet_throughput += outcome.sent;
            }
        }
    }

    /// Delivered share of attempted payments, `0.0` for an empty run.
    pub fn success_ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.delivered as f64 / self.attempted as f64
        }
    }
}

/// Route `payments` in order against `network`, one at a time.
pub fn run_payments(
    strategy: &mut dyn RoutingStrategy,
    network: &mut CreditNetwork,
    payments: &[Payment],
) -> Result<RunStats, RoutingError> {
    let mut stats = RunStats::default();
    for payment in payments {
        let outcome = strategy.route(network, payment)?;
        tracing::debug!(
            src = payment.src,
            dst = payment.dst,
            amount = payment.amount,
            delivered = outcome.is_delivered(),
            probe = outcome.messages.probe,
            commit = outcome.messages.commit,
            "payment routed"
        );
        stats.record(&outcome);
    }

    tracing::info!(
        scheme = strategy.name(),
        attempted = stats.attempted,
        delivered = stats.delivered,
        throughput = stats.throughput,
        probe = stats.probe_messages,
        commit = stats.commit_messages,
        request = stats.request_messages,
        "run complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MaxFlow, ShortestPath};

    fn line() -> CreditNetwork {
        let mut net = CreditNetwork::new();
        net.add_channel(0, 1, 100.0, 100.0).unwrap();
        net.add_channel(1, 2, 100.0, 100.0).unwrap();
        net
    }

    #[test]
    fn test_run_accumulates_outcomes() {
        let mut net = line();
        let payments = [
            Payment::new(0, 2, 50.0),
            Payment::new(0, 2, 80.0),
            Payment::new(2, 0, 30.0),
            Payment::new(1, 1, 5.0),
        ];
        let stats = run_payments(&mut ShortestPath, &mut net, &payments).unwrap();
        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.throughput, 85.0);
        assert_eq!(stats.request_messages, 0);
        assert_eq!(stats.subnet_delivered, 0);
        assert!((stats.success_ratio() - 0.75).abs() < 1e-12);
        assert_eq!(net.balance(0, 1).unwrap(), 80.0);
    }

    #[test]
    fn test_empty_run() {
        let mut net = line();
        let stats = run_payments(&mut MaxFlow::default(), &mut net, &[]).unwrap();
        assert_eq!(stats, RunStats::default());
        assert_eq!(stats.success_ratio(), 0.0);
    }

    #[test]
    fn test_unknown_node_aborts_run() {
        let mut net = line();
        let payments = [Payment::new(0, 9, 1.0)];
        assert!(matches!(
            run_payments(&mut ShortestPath, &mut net, &payments),
            Err(RoutingError::Network(_))
        ));
    }
}
