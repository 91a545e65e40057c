//! Partitioned routing end to end: partitions, index topology, seg_flow.

use std::sync::Arc;

use pcn_core::{CreditNetwork, Payment, UndirectedGraph};
use pcn_integration_tests::{hierarchy, random_network, random_payments};
use pcn_partition::{IndexTopology, PartitionSet};
use pcn_routing::{run_payments, Hierarchy, RouteScope, RoutingStrategy, SegFlow, StrategyConfig};

fn graph(edges: &[(u32, u32)]) -> UndirectedGraph {
    let mut g = UndirectedGraph::new();
    for &(a, b) in edges {
        g.add_edge(a, b);
    }
    g
}

/// Three diamond partitions in a row joined at boundary nodes 3 and 6:
/// {0,1,2,3} - {3,4,5,6} - {6,7,8,9}. Every channel holds 10 each way.
fn chain() -> (CreditNetwork, PartitionSet) {
    let left = [(0, 1), (1, 3), (0, 2), (2, 3)];
    let middle = [(3, 4), (4, 6), (3, 5), (5, 6)];
    let right = [(6, 7), (7, 9), (6, 8), (8, 9)];
    let mut net = CreditNetwork::new();
    for &(a, b) in left.iter().chain(&middle).chain(&right) {
        net.add_channel(a, b, 10.0, 10.0).unwrap();
    }
    let partitions = PartitionSet::from_graphs(vec![graph(&left), graph(&middle), graph(&right)]);
    (net, partitions)
}

#[tokio::test]
async fn test_index_links_adjacent_boundaries() {
    let (_, partitions) = chain();
    let index = IndexTopology::build(Arc::new(partitions)).await.unwrap();
    let edges: Vec<_> = index
        .edges_from(3)
        .iter()
        .map(|e| (e.to, e.length, e.partition))
        .collect();
    assert_eq!(edges, vec![(6, 2, 1)]);
    assert_eq!(index.stats().edges, 2);
}

#[tokio::test]
async fn test_cross_partition_payment_splits_over_every_diamond() {
    let (mut net, partitions) = chain();
    let hierarchy = Hierarchy::build(Arc::new(partitions)).await.unwrap();
    let mut router = SegFlow::new(hierarchy, 8, 3, 0);

    let outcome = router.route(&mut net, &Payment::new(0, 9, 15.0)).unwrap();
    assert!(outcome.is_delivered(), "{outcome:?}");
    assert_eq!(outcome.scope, RouteScope::InterSubnet);
    // One index path crossing three partitions.
    assert_eq!(outcome.messages.request, 3);
    for (a, b) in [(0, 1), (0, 2), (3, 4), (3, 5), (6, 7), (6, 8)] {
        assert!(
            (net.balance(a, b).unwrap() - 2.5).abs() < 1e-9,
            "{a}->{b} should carry 7.5"
        );
    }
}

#[tokio::test]
async fn test_intra_partition_failure_falls_back_to_index() {
    let (mut net, partitions) = chain();
    let hierarchy = Hierarchy::build(Arc::new(partitions)).await.unwrap();
    let mut router = SegFlow::new(hierarchy, 4, 3, 0);

    // 0 and 3 share the left partition, but no single path carries 15.
    let outcome = router.route(&mut net, &Payment::new(0, 3, 15.0)).unwrap();
    assert!(outcome.is_delivered(), "{outcome:?}");
    assert_eq!(outcome.scope, RouteScope::InterSubnet);
    assert_eq!(outcome.messages.request, 1);
    assert!(outcome.messages.commit > 0);
    assert!((net.balance(3, 1).unwrap() - 17.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_subnet_breakdown_in_run_stats() {
    let net = random_network(50, 70, 40.0, 5);
    let payments = random_payments(50, 120, 15.0, 6);
    let hierarchy = hierarchy(&net, &payments, 4).await;
    let intra = hierarchy.partitions.intra_partition_ratio(&payments);

    let config = StrategyConfig::SegFlow {
        k: 4,
        max_attempts: 3,
    };
    let mut strategy = config.build(&net, &payments, 0, Some(hierarchy)).unwrap();
    let mut run_net = net.clone();
    let stats = run_payments(strategy.as_mut(), &mut run_net, &payments).unwrap();

    assert_eq!(stats.attempted, payments.len());
    assert!(stats.subnet_delivered <= stats.delivered);
    assert!(stats.subnet_throughput <= stats.throughput + 1e-9);
    if intra > 0.0 {
        assert!(stats.subnet_delivered > 0);
    }
    if intra < 1.0 {
        assert!(stats.request_messages > 0);
    }
}
