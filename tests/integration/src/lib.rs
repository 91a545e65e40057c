//! Fixtures shared by the integration tests.

use std::sync::Arc;

use pcn_core::{CreditNetwork, NodeId, Payment};
use pcn_partition::{PartitionConfig, Partitioner, PaymentFrequency};
use pcn_routing::{Hierarchy, RoutingStrategy, StrategyConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 0-1-2 with `balance` in every direction.
pub fn line(balance: f64) -> CreditNetwork {
    CreditNetwork::from_directed_edges([
        (0, 1, balance),
        (1, 0, balance),
        (1, 2, balance),
        (2, 1, balance),
    ])
    .expect("valid line")
}

/// 0-1-3 and 0-2-3 with `balance` in every direction.
pub fn diamond(balance: f64) -> CreditNetwork {
    let mut net = CreditNetwork::new();
    for (a, b) in [(0, 1), (1, 3), (0, 2), (2, 3)] {
        net.add_channel(a, b, balance, balance).expect("valid diamond");
    }
    net
}

/// A connected network of `nodes` nodes: a random spanning tree plus
/// `extra` random chords, balances drawn from `1..=max_balance`.
pub fn random_network(nodes: u32, extra: usize, max_balance: f64, seed: u64) -> CreditNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut net = CreditNetwork::new();
    let open = |net: &mut CreditNetwork, rng: &mut StdRng, a: NodeId, b: NodeId| {
        if a == b || net.has_edge(a, b) {
            return;
        }
        let ab = rng.gen_range(1.0..=max_balance);
        let ba = rng.gen_range(1.0..=max_balance);
        net.add_channel(a, b, ab, ba).expect("fresh channel");
    };
    for node in 1..nodes {
        let parent = rng.gen_range(0..node);
        open(&mut net, &mut rng, parent, node);
    }
    for _ in 0..extra {
        let a = rng.gen_range(0..nodes);
        let b = rng.gen_range(0..nodes);
        open(&mut net, &mut rng, a, b);
    }
    net
}

/// `count` payments between distinct random nodes of `0..nodes`.
pub fn random_payments(nodes: u32, count: usize, max_amount: f64, seed: u64) -> Vec<Payment> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let src = rng.gen_range(0..nodes);
            let mut dst = rng.gen_range(0..nodes);
            while dst == src {
                dst = rng.gen_range(0..nodes);
            }
            Payment::new(src, dst, rng.gen_range(0.5..max_amount))
        })
        .collect()
}

/// Partition `network` into `n` parts and build the index over them.
pub async fn hierarchy(network: &CreditNetwork, payments: &[Payment], n: usize) -> Hierarchy {
    let config = PartitionConfig {
        num_partitions: n,
        payment_lambda: 1.0,
        seed: 11,
        ..PartitionConfig::default()
    };
    let frequency = PaymentFrequency::from_payments(payments);
    let partitions = Partitioner::new(config)
        .expect("valid config")
        .partition(network, &frequency)
        .expect("partitioned");
    Hierarchy::build(Arc::new(partitions))
        .await
        .expect("index built")
}

/// Every scheme with its default parameters.
pub fn all_schemes() -> Vec<StrategyConfig> {
    [
        "shortest_path",
        "lnd",
        "max_flow",
        "spider",
        "path_cache",
        "flash",
        "speedy_murmurs",
        "seg_flow",
    ]
    .into_iter()
    .map(scheme_config)
    .collect()
}

fn scheme_config(scheme: &str) -> StrategyConfig {
    match scheme {
        "shortest_path" => StrategyConfig::ShortestPath,
        "lnd" => StrategyConfig::Lnd { max_attempts: 3 },
        "max_flow" => StrategyConfig::MaxFlow { max_iterations: 20 },
        "spider" => StrategyConfig::Spider {
            k: 4,
            payment_unit: None,
        },
        "path_cache" => StrategyConfig::PathCache { num_max_cache: 4 },
        "flash" => StrategyConfig::Flash {
            threshold: None,
            percentile: 90.0,
            num_max_cache: 4,
            max_iterations: 20,
        },
        "speedy_murmurs" => StrategyConfig::SpeedyMurmurs { landmarks: 3 },
        _ => StrategyConfig::SegFlow {
            k: 4,
            max_attempts: 3,
        },
    }
}

/// Build `config` for `network`, supplying a hierarchy when it needs one.
pub fn build(
    config: &StrategyConfig,
    network: &CreditNetwork,
    payments: &[Payment],
    hierarchy: &Hierarchy,
) -> Box<dyn RoutingStrategy> {
    let hierarchy = config.needs_hierarchy().then(|| hierarchy.clone());
    config
        .build(network, payments, 5, hierarchy)
        .expect("strategy builds")
}

/// Largest absolute difference between two balance snapshots.
pub fn max_balance_drift(
    before: &[((NodeId, NodeId), f64)],
    after: &[((NodeId, NodeId), f64)],
) -> f64 {
    assert_eq!(before.len(), after.len(), "channel set changed");
    before
        .iter()
        .zip(after)
        .map(|((ea, a), (eb, b))| {
            assert_eq!(ea, eb, "channel order changed");
            (a - b).abs()
        })
        .fold(0.0, f64::max)
}
