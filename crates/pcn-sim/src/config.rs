//! Simulator configuration loading and management.

use pcn_partition::PartitionConfig;
use pcn_routing::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for a simulation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimConfig {
    /// Base seed for randomized strategies; run `i` uses `seed + i`.
    #[serde(default)]
    pub seed: u64,

    /// Routing scheme and its parameters.
    #[serde(default)]
    pub routing: StrategyConfig,

    /// Partitioner settings, used by hierarchical routing.
    #[serde(default)]
    pub partition: PartitionConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Factor applied to every directed balance before routing.
    #[serde(default = "default_capacity_scale")]
    pub capacity_scale: f64,
    /// Number of repetitions averaged into the report.
    #[serde(default = "default_runs")]
    pub runs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_capacity_scale() -> f64 {
    1.0
}
fn default_runs() -> usize {
    1
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity_scale: default_capacity_scale(),
            runs: default_runs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SimConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: SimConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.routing.validate()?;
        self.partition.validate()?;
        if self.simulation.runs == 0 {
            anyhow::bail!("simulation.runs must be at least 1");
        }
        let scale = self.simulation.capacity_scale;
        if !(scale.is_finite() && scale > 0.0) {
            anyhow::bail!("simulation.capacity_scale must be positive, got {scale}");
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be \"text\" or \"json\"");
        }
        Ok(())
    }
}
