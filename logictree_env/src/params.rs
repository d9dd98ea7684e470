//! Job parameters consumed by logic-tree processing.

use crate::error::EnvError;
use crate::seeds::{DeterministicSeeds, GSIM_AXIS, SOURCE_MODEL_AXIS};
use serde::{Deserialize, Serialize};

/// Default number of stochastic event sets per logic-tree path.
pub const DEFAULT_SES_PER_LOGIC_TREE_PATH: u32 = 1;

/// How realizations are produced from a logic tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LogicTreeMode {
    /// Every path through the tree, weighted by its branch weights
    Enumeration,

    /// `samples` seeded Monte Carlo draws, each weighted 1/samples
    Sampling { samples: u32 },
}

impl LogicTreeMode {
    /// Maps a sample count to a mode (0 = full enumeration).
    pub fn from_sample_count(samples: u32) -> Self {
        if samples == 0 {
            LogicTreeMode::Enumeration
        } else {
            LogicTreeMode::Sampling { samples }
        }
    }

    /// Returns true for Monte Carlo sampling.
    pub fn is_sampling(&self) -> bool {
        matches!(self, LogicTreeMode::Sampling { .. })
    }

    /// Returns the sample count (0 for enumeration).
    pub fn sample_count(&self) -> u32 {
        match self {
            LogicTreeMode::Enumeration => 0,
            LogicTreeMode::Sampling { samples } => *samples,
        }
    }
}

impl std::fmt::Display for LogicTreeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicTreeMode::Enumeration => write!(f, "enumeration"),
            LogicTreeMode::Sampling { samples } => write!(f, "sampling({})", samples),
        }
    }
}

/// The two scalars one logic-tree axis consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisParams {
    /// Sample count (0 = full enumeration)
    pub number_of_logic_tree_samples: u32,

    /// Seed of the axis's random streams; required when sampling
    pub random_seed: Option<u64>,
}

impl AxisParams {
    /// Parameters for full enumeration.
    pub fn enumerate() -> Self {
        Self {
            number_of_logic_tree_samples: 0,
            random_seed: None,
        }
    }

    /// Parameters for seeded sampling.
    pub fn sampled(samples: u32, seed: u64) -> Self {
        Self {
            number_of_logic_tree_samples: samples,
            random_seed: Some(seed),
        }
    }

    /// Returns the mode implied by the sample count.
    pub fn mode(&self) -> LogicTreeMode {
        LogicTreeMode::from_sample_count(self.number_of_logic_tree_samples)
    }
}

impl Default for AxisParams {
    fn default() -> Self {
        Self::enumerate()
    }
}

/// Logic-tree parameters of a hazard job.
///
/// Only the keys below are read; everything else in the job descriptor
/// (sites, site_params, erf, boundaries, vulnerability, export) belongs
/// to other components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    /// Number of Monte Carlo samples (0 = full enumeration)
    #[serde(default)]
    pub number_of_logic_tree_samples: u32,

    /// Master seed; mandatory whenever sampling is requested
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Stochastic event sets generated per realization
    #[serde(default = "default_ses_per_logic_tree_path")]
    pub ses_per_logic_tree_path: u32,
}

fn default_ses_per_logic_tree_path() -> u32 {
    DEFAULT_SES_PER_LOGIC_TREE_PATH
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            number_of_logic_tree_samples: 0,
            random_seed: None,
            ses_per_logic_tree_path: DEFAULT_SES_PER_LOGIC_TREE_PATH,
        }
    }
}

impl JobParams {
    /// Builds parameters from resolved `key = value` pairs.
    ///
    /// Unknown keys are ignored. Values are trimmed before parsing.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, EnvError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();

        for (key, value) in pairs {
            let key = key.trim();
            let value = value.trim();
            match key {
                "number_of_logic_tree_samples" => {
                    params.number_of_logic_tree_samples = value
                        .parse()
                        .map_err(|_| EnvError::invalid(key, value, "expected a non-negative integer"))?;
                }
                "random_seed" => {
                    let seed = value
                        .parse()
                        .map_err(|_| EnvError::invalid(key, value, "expected an unsigned 64-bit integer"))?;
                    params.random_seed = Some(seed);
                }
                "ses_per_logic_tree_path" => {
                    params.ses_per_logic_tree_path = value
                        .parse()
                        .map_err(|_| EnvError::invalid(key, value, "expected a positive integer"))?;
                }
                _ => {}
            }
        }

        params.validate()?;
        Ok(params)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.ses_per_logic_tree_path == 0 {
            return Err(EnvError::invalid(
                "ses_per_logic_tree_path",
                self.ses_per_logic_tree_path,
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Returns the realization mode.
    ///
    /// A zero sample count always means enumeration, whatever
    /// `ses_per_logic_tree_path` says.
    pub fn mode(&self) -> LogicTreeMode {
        LogicTreeMode::from_sample_count(self.number_of_logic_tree_samples)
    }

    /// Parameters of the source-model axis.
    pub fn source_model_axis(&self) -> AxisParams {
        self.axis(SOURCE_MODEL_AXIS)
    }

    /// Parameters of the GSIM axis.
    pub fn gsim_axis(&self) -> AxisParams {
        self.axis(GSIM_AXIS)
    }

    fn axis(&self, axis: u64) -> AxisParams {
        AxisParams {
            number_of_logic_tree_samples: self.number_of_logic_tree_samples,
            random_seed: self
                .random_seed
                .map(|seed| DeterministicSeeds::new(seed).axis_seed(axis)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_samples_selects_enumeration() {
        let job = JobParams::from_pairs([
            ("number_of_logic_tree_samples", "0"),
            ("ses_per_logic_tree_path", "1"),
        ])
        .unwrap();

        assert_eq!(job.mode(), LogicTreeMode::Enumeration);
        assert!(!job.mode().is_sampling());
        assert_eq!(job.ses_per_logic_tree_path, 1);
    }

    #[test]
    fn test_positive_samples_selects_sampling() {
        let job = JobParams::from_pairs([
            ("number_of_logic_tree_samples", " 10 "),
            ("random_seed", "23"),
        ])
        .unwrap();

        assert_eq!(job.mode(), LogicTreeMode::Sampling { samples: 10 });
        assert_eq!(job.mode().sample_count(), 10);
        assert_eq!(job.random_seed, Some(23));
    }

    #[test]
    fn test_unrelated_keys_ignored() {
        let job = JobParams::from_pairs([
            ("calculation_mode", "classical"),
            ("truncation_level", "3"),
            ("reference_vs30_value", "760.0"),
        ])
        .unwrap();

        assert_eq!(job, JobParams::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = JobParams::from_pairs([("number_of_logic_tree_samples", "-1")]).unwrap_err();
        assert!(matches!(err, EnvError::InvalidParameter { ref key, .. } if key == "number_of_logic_tree_samples"));

        let err = JobParams::from_pairs([("ses_per_logic_tree_path", "0")]).unwrap_err();
        assert!(matches!(err, EnvError::InvalidParameter { ref key, .. } if key == "ses_per_logic_tree_path"));

        assert!(JobParams::from_pairs([("random_seed", "forty-two")]).is_err());
    }

    #[test]
    fn test_axis_params_derive_distinct_seeds() {
        let job = JobParams {
            number_of_logic_tree_samples: 5,
            random_seed: Some(42),
            ..Default::default()
        };

        let sm = job.source_model_axis();
        let gsim = job.gsim_axis();

        assert_eq!(sm.mode(), LogicTreeMode::Sampling { samples: 5 });
        assert_eq!(gsim.number_of_logic_tree_samples, 5);
        assert!(sm.random_seed.is_some());
        assert_ne!(sm.random_seed, gsim.random_seed);

        // Unseeded jobs stay unseeded on both axes
        let unseeded = JobParams::default();
        assert_eq!(unseeded.source_model_axis().random_seed, None);
        assert_eq!(unseeded.gsim_axis(), AxisParams::enumerate());
    }

    #[test]
    fn test_deserialize_defaults() {
        let job: JobParams = serde_json::from_str(r#"{"number_of_logic_tree_samples": 3, "random_seed": 7}"#).unwrap();

        assert_eq!(job.ses_per_logic_tree_path, DEFAULT_SES_PER_LOGIC_TREE_PATH);
        assert_eq!(job.mode(), LogicTreeMode::Sampling { samples: 3 });
    }
}
