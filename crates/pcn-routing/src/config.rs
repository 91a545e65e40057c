use pcn_core::{CreditNetwork, Payment};
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::flash::{percentile_threshold, Flash};
use crate::landmark::{SpeedyMurmurs, DEFAULT_LANDMARKS};
use crate::lnd::{Lnd, DEFAULT_MAX_ATTEMPTS};
use crate::max_flow::{MaxFlow, DEFAULT_MAX_ITERATIONS};
use crate::path_cache::{PathCacheRouter, DEFAULT_CACHED_PATHS};
use crate::segflow::{Hierarchy, SegFlow, DEFAULT_SEGMENT_PATHS};
use crate::shortest_path::ShortestPath;
use crate::spider::{Spider, DEFAULT_PATHS};
use crate::strategy::RoutingStrategy;

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_paths() -> usize {
    DEFAULT_PATHS
}

fn default_cached_paths() -> usize {
    DEFAULT_CACHED_PATHS
}

fn default_percentile() -> f64 {
    90.0
}

fn default_landmarks() -> usize {
    DEFAULT_LANDMARKS
}

fn default_segment_paths() -> usize {
    DEFAULT_SEGMENT_PATHS
}

/// Which routing scheme to run, with its parameters.
///
/// Serialized with a `scheme` tag, so a TOML section reads
/// `scheme = "flash"` followed by the scheme's own keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum StrategyConfig {
    ShortestPath,
    Lnd {
        #[serde(default = "default_max_attempts")]
        max_attempts: usize,
    },
    MaxFlow {
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
    },
    Spider {
        #[serde(default = "default_paths")]
        k: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payment_unit: Option<f64>,
    },
    PathCache {
        #[serde(default = "default_cached_paths")]
        num_max_cache: usize,
    },
    Flash {
        /// Fixed size threshold; when absent it is taken from `percentile`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
        #[serde(default = "default_percentile")]
        percentile: f64,
        #[serde(default = "default_cached_paths")]
        num_max_cache: usize,
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
    },
    SpeedyMurmurs {
        #[serde(default = "default_landmarks")]
        landmarks: usize,
    },
    SegFlow {
        #[serde(default = "default_segment_paths")]
        k: usize,
        #[serde(default = "default_max_attempts")]
        max_attempts: usize,
    },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::MaxFlow {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

fn at_least_one(name: &str, value: usize) -> Result<(), RoutingError> {
    if value == 0 {
        return Err(RoutingError::InvalidConfig {
            reason: format!("{name} must be at least 1"),
        });
    }
    Ok(())
}

impl StrategyConfig {
    /// The scheme tag, matching [`RoutingStrategy::name`].
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::ShortestPath => "shortest_path",
            Self::Lnd { .. } => "lnd",
            Self::MaxFlow { .. } => "max_flow",
            Self::Spider { .. } => "spider",
            Self::PathCache { .. } => "path_cache",
            Self::Flash { .. } => "flash",
            Self::SpeedyMurmurs { .. } => "speedy_murmurs",
            Self::SegFlow { .. } => "seg_flow",
        }
    }

    /// Whether [`StrategyConfig::build`] needs a [`Hierarchy`].
    pub fn needs_hierarchy(&self) -> bool {
        matches!(self, Self::SegFlow { .. })
    }

    pub fn validate(&self) -> Result<(), RoutingError> {
        match *self {
            Self::ShortestPath => Ok(()),
            Self::Lnd { max_attempts } => at_least_one("max_attempts", max_attempts),
            Self::MaxFlow { max_iterations } => at_least_one("max_iterations", max_iterations),
            Self::Spider { k, payment_unit } => {
                at_least_one("k", k)?;
                match payment_unit {
                    Some(unit) if !(unit.is_finite() && unit > 0.0) => {
                        Err(RoutingError::InvalidConfig {
                            reason: format!("payment_unit must be positive, got {unit}"),
                        })
                    }
                    _ => Ok(()),
                }
            }
            Self::PathCache { num_max_cache } => at_least_one("num_max_cache", num_max_cache),
            Self::Flash {
                threshold,
                percentile,
                num_max_cache,
                max_iterations,
            } => {
                at_least_one("num_max_cache", num_max_cache)?;
                at_least_one("max_iterations", max_iterations)?;
                if !(0.0..=100.0).contains(&percentile) {
                    return Err(RoutingError::InvalidConfig {
                        reason: format!("percentile must be within 0..=100, got {percentile}"),
                    });
                }
                match threshold {
                    Some(t) if !(t.is_finite() && t >= 0.0) => Err(RoutingError::InvalidConfig {
                        reason: format!("threshold must be non-negative, got {t}"),
                    }),
                    _ => Ok(()),
                }
            }
            Self::SpeedyMurmurs { landmarks } => at_least_one("landmarks", landmarks),
            Self::SegFlow { k, max_attempts } => {
                at_least_one("k", k)?;
                at_least_one("max_attempts", max_attempts)
            }
        }
    }

    /// Instantiate the configured strategy.
    ///
    /// `payments` feeds the flash percentile threshold, `network` the
    /// landmark embeddings and `seed` every randomized choice.
    pub fn build(
        &self,
        network: &CreditNetwork,
        payments: &[Payment],
        seed: u64,
        hierarchy: Option<Hierarchy>,
    ) -> Result<Box<dyn RoutingStrategy>, RoutingError> {
        self.validate()?;
        let strategy: Box<dyn RoutingStrategy> = match *self {
            Self::ShortestPath => Box::new(ShortestPath),
            Self::Lnd { max_attempts } => Box::new(Lnd::new(max_attempts)),
            Self::MaxFlow { max_iterations } => Box::new(MaxFlow::new(max_iterations)),
            Self::Spider { k, payment_unit } => {
                let spider = Spider::new(k);
                Box::new(match payment_unit {
                    Some(unit) => spider.with_payment_unit(unit),
                    None => spider,
                })
            }
            Self::PathCache { num_max_cache } => Box::new(PathCacheRouter::new(num_max_cache)),
            Self::Flash {
                threshold,
                percentile,
                num_max_cache,
                max_iterations,
            } => {
                let threshold =
                    threshold.unwrap_or_else(|| percentile_threshold(payments, percentile));
                tracing::debug!(threshold, "flash threshold chosen");
                Box::new(Flash::new(threshold, num_max_cache, max_iterations))
            }
            Self::SpeedyMurmurs { landmarks } => {
                Box::new(SpeedyMurmurs::new(network, landmarks, seed)?)
            }
            Self::SegFlow { k, max_attempts } => {
                let hierarchy = hierarchy.ok_or(RoutingError::MissingHierarchy {
                    scheme: self.scheme(),
                })?;
                Box::new(SegFlow::new(hierarchy, k, max_attempts, seed))
            }
        };
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> CreditNetwork {
        let mut net = CreditNetwork::new();
        net.add_channel(0, 1, 10.0, 10.0).unwrap();
        net.add_channel(1, 2, 10.0, 10.0).unwrap();
        net
    }

    #[test]
    fn test_default_is_max_flow() {
        let config = StrategyConfig::default();
        assert_eq!(config.scheme(), "max_flow");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tagged_json_with_defaults() {
        let config: StrategyConfig = serde_json::from_str(r#"{"scheme":"flash"}"#).unwrap();
        assert_eq!(
            config,
            StrategyConfig::Flash {
                threshold: None,
                percentile: 90.0,
                num_max_cache: 4,
                max_iterations: 20,
            }
        );
        let config: StrategyConfig =
            serde_json::from_str(r#"{"scheme":"seg_flow","k":2}"#).unwrap();
        assert_eq!(
            config,
            StrategyConfig::SegFlow {
                k: 2,
                max_attempts: 3
            }
        );
        let json = serde_json::to_string(&StrategyConfig::ShortestPath).unwrap();
        assert_eq!(json, r#"{"scheme":"shortest_path"}"#);
    }

    #[test]
    fn test_validate_rejects_zero_parameters() {
        for config in [
            StrategyConfig::Lnd { max_attempts: 0 },
            StrategyConfig::Spider {
                k: 2,
                payment_unit: Some(0.0),
            },
            StrategyConfig::Flash {
                threshold: None,
                percentile: 120.0,
                num_max_cache: 4,
                max_iterations: 20,
            },
            StrategyConfig::SpeedyMurmurs { landmarks: 0 },
        ] {
            assert!(
                matches!(config.validate(), Err(RoutingError::InvalidConfig { .. })),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_build_names_match_schemes() {
        let net = line();
        let payments = [Payment::new(0, 2, 1.0)];
        for config in [
            StrategyConfig::ShortestPath,
            StrategyConfig::Lnd { max_attempts: 3 },
            StrategyConfig::MaxFlow { max_iterations: 5 },
            StrategyConfig::Spider {
                k: 2,
                payment_unit: Some(1.0),
            },
            StrategyConfig::PathCache { num_max_cache: 2 },
            StrategyConfig::Flash {
                threshold: Some(3.0),
                percentile: 90.0,
                num_max_cache: 4,
                max_iterations: 20,
            },
            StrategyConfig::SpeedyMurmurs { landmarks: 2 },
        ] {
            let strategy = config.build(&net, &payments, 1, None).unwrap();
            assert_eq!(strategy.name(), config.scheme());
        }
    }

    #[test]
    fn test_seg_flow_requires_hierarchy() {
        let config = StrategyConfig::SegFlow {
            k: 4,
            max_attempts: 3,
        };
        assert!(config.needs_hierarchy());
        assert!(matches!(
            config.build(&line(), &[], 0, None),
            Err(RoutingError::MissingHierarchy { scheme: "seg_flow" })
        ));
    }
}
