//! Balance invariants that every routing scheme must keep.

use pcn_core::BALANCE_EPSILON;
use pcn_integration_tests::{
    all_schemes, build, hierarchy, max_balance_drift, random_network, random_payments,
};
use pcn_routing::{
    augmenting_paths, run_payments, MaxFlow, RoutingStrategy, ALLOCATION_TOLERANCE,
};

const NODES: u32 = 40;

#[tokio::test]
async fn test_every_scheme_conserves_and_rolls_back() {
    let base = random_network(NODES, 60, 30.0, 21);
    let payments = random_payments(NODES, 150, 40.0, 22);
    let hierarchy = hierarchy(&base, &payments, 4).await;
    let total = base.total_balance();

    for config in all_schemes() {
        let mut net = base.clone();
        let mut strategy = build(&config, &net, &payments, &hierarchy);
        let mut delivered = 0;

        for payment in &payments {
            let before = net.directed_balances();
            let outcome = strategy.route(&mut net, payment).unwrap();
            let after = net.directed_balances();

            assert!(
                after.iter().all(|(_, b)| *b >= -BALANCE_EPSILON),
                "{}: negative balance after {payment:?}",
                config.scheme()
            );
            assert!(
                (net.total_balance() - total).abs() < 1e-6,
                "{}: total balance drifted",
                config.scheme()
            );
            if outcome.is_delivered() {
                delivered += 1;
                assert_eq!(outcome.sent, payment.amount);
            } else {
                assert_eq!(outcome.sent, 0.0);
                assert!(
                    max_balance_drift(&before, &after) <= 1e-9,
                    "{}: failed payment {payment:?} left a trace",
                    config.scheme()
                );
            }
        }
        assert!(delivered > 0, "{} delivered nothing", config.scheme());
    }
}

#[tokio::test]
async fn test_channel_capacities_never_change() {
    let base = random_network(NODES, 40, 25.0, 31);
    let payments = random_payments(NODES, 100, 20.0, 32);
    let hierarchy = hierarchy(&base, &payments, 3).await;

    for config in all_schemes() {
        let mut net = base.clone();
        let mut strategy = build(&config, &net, &payments, &hierarchy);
        run_payments(strategy.as_mut(), &mut net, &payments).unwrap();

        for (before, after) in base.channels().iter().zip(net.channels()) {
            assert!(
                (before.capacity() - after.capacity()).abs() < 1e-6,
                "{}: channel {}-{} changed capacity",
                config.scheme(),
                before.low,
                before.high
            );
        }
    }
}

#[tokio::test]
async fn test_runs_are_reproducible() {
    let base = random_network(NODES, 60, 30.0, 41);
    let payments = random_payments(NODES, 80, 30.0, 42);
    let hierarchy = hierarchy(&base, &payments, 4).await;

    for config in all_schemes() {
        let mut first = base.clone();
        let mut second = base.clone();
        let a = run_payments(
            build(&config, &first, &payments, &hierarchy).as_mut(),
            &mut first,
            &payments,
        )
        .unwrap();
        let b = run_payments(
            build(&config, &second, &payments, &hierarchy).as_mut(),
            &mut second,
            &payments,
        )
        .unwrap();
        assert_eq!(a, b, "{} is not reproducible", config.scheme());
        assert_eq!(first.directed_balances(), second.directed_balances());
    }
}

#[test]
fn test_max_flow_delivers_whenever_probe_covers_amount() {
    let mut covered = 0;
    for seed in 0..8 {
        let mut net = random_network(NODES, 70, 20.0, 100 + seed);
        let payments = random_payments(NODES, 60, 45.0, 200 + seed);
        let mut router = MaxFlow::new(20);

        for payment in &payments {
            let probe = augmenting_paths(&net, payment.src, payment.dst, 20, None).unwrap();
            let outcome = router.route(&mut net, payment).unwrap();
            if probe.total_capacity() + ALLOCATION_TOLERANCE >= payment.amount {
                covered += 1;
                assert!(
                    outcome.is_delivered(),
                    "seed {seed}: {payment:?} probed {} but got {outcome:?}",
                    probe.total_capacity()
                );
            } else {
                assert_eq!(outcome.messages.commit, 0);
            }
        }
    }
    assert!(covered > 0);
}

