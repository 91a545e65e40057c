//! `pcn-sim init` — write a default configuration file.

use clap::Args;
use std::path::Path;

use crate::config::SimConfig;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, path: &Path) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!(
            "configuration file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    SimConfig::default().save(path)?;
    tracing::info!(path = %path.display(), "wrote default config");
    println!("Wrote default configuration to {}", path.display());
    println!("Run 'pcn-sim route <scenario.json>' to route its payments.");
    Ok(())
}
