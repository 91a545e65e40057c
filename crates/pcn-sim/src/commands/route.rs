//! `pcn-sim route` — route a scenario's payments and report the averages.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use pcn_routing::{run_payments, RunStats};

use crate::commands::partition::build_hierarchy;
use crate::config::SimConfig;
use crate::scenario::Scenario;

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Scenario file (JSON) with channels and payments.
    pub scenario: PathBuf,

    /// Override the routing scheme (its parameters take their defaults).
    #[arg(short, long)]
    pub scheme: Option<String>,

    /// Override the number of runs.
    #[arg(short, long)]
    pub runs: Option<usize>,

    /// Override the base seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the capacity scale factor.
    #[arg(long)]
    pub capacity_scale: Option<f64>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Run statistics averaged over every repetition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteReport {
    pub scheme: &'static str,
    pub runs: usize,
    pub attempted: f64,
    pub delivered: f64,
    pub throughput: f64,
    pub success_ratio: f64,
    pub probe_messages: f64,
    pub commit_messages: f64,
    pub request_messages: f64,
    pub subnet_delivered: f64,
    pub subnet_throughput: f64,
}

impl RouteReport {
    pub fn average(scheme: &'static str, runs: &[RunStats]) -> Self {
        let n = runs.len().max(1) as f64;
        let mean = |f: fn(&RunStats) -> f64| runs.iter().map(f).sum::<f64>() / n;
        Self {
            scheme,
            runs: runs.len(),
            attempted: mean(|s| s.attempted as f64),
            delivered: mean(|s| s.delivered as f64),
            throughput: mean(|s| s.throughput),
            success_ratio: mean(RunStats::success_ratio),
            probe_messages: mean(|s| s.probe_messages as f64),
            commit_messages: mean(|s| s.commit_messages as f64),
            request_messages: mean(|s| s.request_messages as f64),
            subnet_delivered: mean(|s| s.subnet_delivered as f64),
            subnet_throughput: mean(|s| s.subnet_throughput),
        }
    }

    fn print(&self) {
        println!("Scheme:            {}", self.scheme);
        println!("Runs:              {}", self.runs);
        println!("Payments:          {:.1}", self.attempted);
        println!(
            "Delivered:         {:.1} ({:.1}%)",
            self.delivered,
            self.success_ratio * 100.0
        );
        println!("Throughput:        {:.3}", self.throughput);
        println!("Probe messages:    {:.1}", self.probe_messages);
        println!("Commit messages:   {:.1}", self.commit_messages);
        if self.request_messages > 0.0 || self.subnet_delivered > 0.0 {
            println!("Request messages:  {:.1}", self.request_messages);
            println!(
                "Subnet delivered:  {:.1} (throughput {:.3})",
                self.subnet_delivered, self.subnet_throughput
            );
        }
    }
}

fn apply_overrides(args: &RouteArgs, config: &mut SimConfig) -> anyhow::Result<()> {
    if let Some(scheme) = &args.scheme {
        config.routing = serde_json::from_value(serde_json::json!({ "scheme": scheme }))
            .map_err(|e| anyhow::anyhow!("unknown scheme {scheme:?}: {e}"))?;
    }
    if let Some(runs) = args.runs {
        config.simulation.runs = runs;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(scale) = args.capacity_scale {
        config.simulation.capacity_scale = scale;
    }
    config.validate()
}

pub async fn run(args: &RouteArgs, mut config: SimConfig) -> anyhow::Result<()> {
    apply_overrides(args, &mut config)?;

    let scenario = Scenario::load(&args.scenario)?;
    let mut base = scenario.network()?;
    base.scale_balances(config.simulation.capacity_scale);
    tracing::info!(
        nodes = base.node_count(),
        channels = base.channel_count(),
        payments = scenario.payments.len(),
        scheme = config.routing.scheme(),
        "scenario loaded"
    );

    let hierarchy = if config.routing.needs_hierarchy() {
        Some(build_hierarchy(&base, &scenario.payments, &config.partition).await?)
    } else {
        None
    };

    let mut runs = Vec::with_capacity(config.simulation.runs);
    for run in 0..config.simulation.runs {
        let mut network = base.clone();
        let seed = config.seed.wrapping_add(run as u64);
        let mut strategy =
            config
                .routing
                .build(&network, &scenario.payments, seed, hierarchy.clone())?;
        let stats = run_payments(strategy.as_mut(), &mut network, &scenario.payments)?;
        tracing::debug!(run, seed, delivered = stats.delivered, "run finished");
        runs.push(stats);
    }

    let report = RouteReport::average(config.routing.scheme(), &runs);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}
