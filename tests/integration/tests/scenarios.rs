//! End-to-end scenarios for the baseline, max-flow and partitioning paths.

use pcn_core::{Payment, UndirectedGraph};
use pcn_integration_tests::{diamond, line, random_network, random_payments};
use pcn_partition::{PartitionConfig, Partitioner, PaymentFrequency};
use pcn_routing::{FailureReason, MaxFlow, RoutingStrategy, ShortestPath};

#[test]
fn test_scenario_a_shortest_path_on_line() {
    let mut net = line(100.0);
    let outcome = ShortestPath
        .route(&mut net, &Payment::new(0, 2, 50.0))
        .unwrap();

    assert_eq!(outcome.sent, 50.0);
    assert_eq!(outcome.messages.commit, 2);
    assert_eq!(net.balance(0, 1).unwrap(), 50.0);
    assert_eq!(net.balance(1, 0).unwrap(), 150.0);
    assert_eq!(net.balance(1, 2).unwrap(), 50.0);
    assert_eq!(net.balance(2, 1).unwrap(), 150.0);
}

#[test]
fn test_scenario_b_max_flow_splits_over_diamond() {
    let mut net = diamond(10.0);
    let outcome = MaxFlow::default()
        .route(&mut net, &Payment::new(0, 3, 15.0))
        .unwrap();

    assert!(outcome.is_delivered());
    assert_eq!(outcome.sent, 15.0);
    for (a, b) in [(0, 1), (1, 3), (0, 2), (2, 3)] {
        assert!(
            (net.balance(a, b).unwrap() - 2.5).abs() < 1e-9,
            "{a}->{b} should carry 7.5"
        );
    }
}

#[test]
fn test_scenario_c_insufficient_capacity_restores_diamond() {
    let mut net = diamond(10.0);
    let outcome = MaxFlow::default()
        .route(&mut net, &Payment::new(0, 3, 25.0))
        .unwrap();

    assert_eq!(outcome.sent, 0.0);
    assert_eq!(outcome.failure(), Some(FailureReason::InsufficientCapacity));
    for (a, b) in [(0, 1), (1, 3), (0, 2), (2, 3)] {
        assert_eq!(net.balance(a, b).unwrap(), 10.0);
        assert_eq!(net.balance(b, a).unwrap(), 10.0);
    }
}

#[test]
fn test_scenario_d_partitioning_is_deterministic() {
    let net = random_network(60, 90, 50.0, 3);
    let payments = random_payments(60, 200, 10.0, 4);
    let frequency = PaymentFrequency::from_payments(&payments);
    let config = PartitionConfig {
        num_partitions: 5,
        payment_lambda: 0.5,
        seed: 99,
        ..PartitionConfig::default()
    };

    let first = Partitioner::new(config.clone())
        .unwrap()
        .partition(&net, &frequency)
        .unwrap();
    let second = Partitioner::new(config)
        .unwrap()
        .partition(&net, &frequency)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_partition_coverage() {
    let net = random_network(80, 120, 20.0, 8);
    let full = net.to_undirected();
    for n in [1, 2, 7, 16] {
        let config = PartitionConfig {
            num_partitions: n,
            ..PartitionConfig::default()
        };
        let partitions = Partitioner::new(config)
            .unwrap()
            .partition(&net, &PaymentFrequency::new())
            .unwrap();
        assert_eq!(partitions.len(), n);

        let mut union = UndirectedGraph::new();
        let mut edges = 0;
        for p in partitions.partitions() {
            edges += p.graph.edge_count();
            union.merge(&p.graph);
        }
        assert_eq!(edges, full.edge_count(), "n={n}: an edge was duplicated or lost");
        assert_eq!(union.node_count(), full.node_count(), "n={n}: a node was lost");
        for (a, b) in full.edges() {
            assert!(union.has_edge(a, b), "n={n}: edge {a}-{b} missing");
        }
        for node in full.nodes() {
            assert_eq!(
                partitions.is_boundary(node),
                partitions.partitions_of(node).len() > 1
            );
        }
    }
}
