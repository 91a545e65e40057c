//! `pcn-sim partition` — partition a scenario's network and report on it.

use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use pcn_core::{CreditNetwork, Payment};
use pcn_partition::{
    BoundaryNode, IndexStats, PartitionConfig, PartitionSummary, Partitioner, PaymentFrequency,
};
use pcn_routing::Hierarchy;

use crate::config::SimConfig;
use crate::scenario::Scenario;

#[derive(Args, Debug)]
pub struct PartitionArgs {
    /// Scenario file (JSON) with channels and payments.
    pub scenario: PathBuf,

    /// Override the number of partitions.
    #[arg(short = 'n', long)]
    pub num_partitions: Option<usize>,

    /// Override the partitioner seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of boundary nodes listed in the text report.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Partition `network` with payment locality from `payments`, then build
/// the index topology over the result.
pub async fn build_hierarchy(
    network: &CreditNetwork,
    payments: &[Payment],
    config: &PartitionConfig,
) -> anyhow::Result<Hierarchy> {
    let frequency = PaymentFrequency::from_payments(payments);
    let mut partitioner = Partitioner::new(config.clone())?;
    let partitions = Arc::new(partitioner.partition(network, &frequency)?);
    tracing::debug!(
        partitions = partitions.len(),
        boundary = partitions.boundary_nodes().len(),
        "network partitioned"
    );
    Ok(Hierarchy::build(partitions).await?)
}

#[derive(Debug, Serialize)]
pub struct PartitionReport {
    pub partitions: Vec<PartitionSummary>,
    /// Nodes living in exactly `r` partitions, keyed by `r`.
    pub replication: BTreeMap<usize, usize>,
    pub intra_partition_ratio: f64,
    pub boundary: Vec<BoundaryNode>,
    pub index: IndexStats,
}

impl PartitionReport {
    pub fn new(hierarchy: &Hierarchy, network: &CreditNetwork, payments: &[Payment]) -> Self {
        let partitions = &hierarchy.partitions;
        Self {
            partitions: partitions.summaries(),
            replication: partitions.replication_distribution(),
            intra_partition_ratio: partitions.intra_partition_ratio(payments),
            boundary: partitions.boundary_report(network),
            index: hierarchy.index.stats(),
        }
    }

    fn print(&self, top: usize) {
        println!("Partitions:");
        for p in &self.partitions {
            println!(
                "  #{:<3} nodes={:<6} edges={:<6} connected={}",
                p.id, p.node_count, p.edge_count, p.connected
            );
        }
        println!();
        println!("Replication:");
        for (r, count) in &self.replication {
            println!("  in {r} partition(s): {count} node(s)");
        }
        println!();
        println!(
            "Intra-partition payments: {:.1}%",
            self.intra_partition_ratio * 100.0
        );
        println!("Boundary nodes: {}", self.boundary.len());
        for b in self.boundary.iter().take(top) {
            println!(
                "  node {:<8} degree={:<5} partitions={}",
                b.node, b.degree, b.partition_count
            );
        }
        println!();
        println!(
            "Index topology: {} nodes, {} edges, {} pairs, mean length {:.2}",
            self.index.nodes, self.index.edges, self.index.distinct_pairs, self.index.mean_length
        );
    }
}

pub async fn run(args: &PartitionArgs, mut config: SimConfig) -> anyhow::Result<()> {
    if let Some(n) = args.num_partitions {
        config.partition.num_partitions = n;
    }
    if let Some(seed) = args.seed {
        config.partition.seed = seed;
    }
    config.partition.validate()?;

    let scenario = Scenario::load(&args.scenario)?;
    let network = scenario.network()?;
    let hierarchy = build_hierarchy(&network, &scenario.payments, &config.partition).await?;
    let report = PartitionReport::new(&hierarchy, &network, &scenario.payments);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print(args.top);
    }
    Ok(())
}
