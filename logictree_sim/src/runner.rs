//! Scenario runner - builds catalogues and checks their invariants.

use crate::loader::HarnessError;
use crate::oracle::ConvergenceOracle;
use crate::scenarios::{ScenarioId, FOUR_GMPE_NAMES};

use logictree_core::{
    ComposedLogicTree, LogicTree, RealizationCatalogue, RealizationEnumerator, SamplerConfig, UncertaintyType,
};
use logictree_env::JobParams;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Allowed deviation of catalogue weight sums from 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    #[serde(serialize_with = "serialize_scenario")]
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all checks
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

fn serialize_scenario<S: serde::Serializer>(id: &ScenarioId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(id.name())
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Composite realizations in the catalogue
    pub realizations: usize,

    /// Source-model paths
    pub source_model_paths: usize,

    /// GSIM paths
    pub gsim_paths: usize,

    /// Sum of composite weights
    pub total_weight: f64,

    /// Warnings attached to the catalogue
    pub warnings: usize,

    /// Worst branch-frequency drift against the enumerated marginals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frequency_deviation: Option<f64>,
}

/// Runs logic-tree scenarios.
pub struct ScenarioRunner {
    /// Master seed of sampled scenarios
    seed: u64,

    /// Sample count of sampled scenarios
    samples: u32,

    /// Sampler shard count (0 = rayon pool size)
    workers: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            samples: 1000,
            workers: 0,
        }
    }

    /// Sets the sample count of sampled scenarios.
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Sets the sampler shard count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Job parameters a scenario runs with.
    pub fn job(&self, scenario: ScenarioId) -> JobParams {
        if scenario.is_sampled() {
            JobParams {
                number_of_logic_tree_samples: self.samples,
                random_seed: Some(self.seed),
                ..JobParams::default()
            }
        } else {
            JobParams::default()
        }
    }

    /// Builds the catalogue of a scenario without checking it.
    pub fn catalogue(&self, scenario: ScenarioId) -> Result<RealizationCatalogue, HarnessError> {
        let (sm, gsim) = scenario.trees()?;
        self.compose(&sm, &gsim, &self.job(scenario), self.workers)
    }

    fn compose(
        &self,
        sm: &LogicTree,
        gsim: &LogicTree,
        job: &JobParams,
        workers: usize,
    ) -> Result<RealizationCatalogue, HarnessError> {
        Ok(ComposedLogicTree::new(sm, gsim)
            .with_sampler_config(SamplerConfig::with_workers(workers))
            .build_for_job(job)?)
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        match self.check(scenario) {
            Ok((metrics, failures)) => {
                let passed = failures.is_empty();
                ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed,
                    failure_reason: if passed { None } else { Some(failures.join("; ")) },
                    metrics,
                }
            }
            Err(e) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                failure_reason: Some(e.to_string()),
                metrics: ScenarioMetrics::default(),
            },
        }
    }

    /// Builds the catalogue and collects every violated invariant.
    fn check(&self, scenario: ScenarioId) -> Result<(ScenarioMetrics, Vec<String>), HarnessError> {
        let (sm, gsim) = scenario.trees()?;
        let job = self.job(scenario);
        let catalogue = self.compose(&sm, &gsim, &job, self.workers)?;

        let mut failures = Vec::new();
        let mut metrics = ScenarioMetrics {
            realizations: catalogue.len(),
            source_model_paths: catalogue.source_model().len(),
            gsim_paths: catalogue.gsim().len(),
            total_weight: catalogue.total_weight(),
            warnings: catalogue.warnings().len(),
            max_frequency_deviation: None,
        };

        // Weights
        if (metrics.total_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            failures.push(format!("weights sum to {:.9}", metrics.total_weight));
        }

        // Count
        let expected = if scenario.is_sampled() {
            self.samples as usize
        } else {
            scenario.enumerated_count()
        };
        if catalogue.len() != expected {
            failures.push(format!("{} realizations, expected {}", catalogue.len(), expected));
        }
        for warning in catalogue.warnings() {
            failures.push(format!("unexpected warning: {}", warning));
        }

        // Determinism
        let again = self.compose(&sm, &gsim, &job, self.workers)?;
        if again != catalogue {
            failures.push("same seed produced a different catalogue".to_string());
        }

        // Worker-count independence
        if scenario.is_sampled() {
            let serial = self.compose(&sm, &gsim, &job, 1)?;
            if serial != catalogue {
                failures.push(format!("{} workers and 1 worker disagree", self.workers));
            }

            let enumerated = RealizationEnumerator::new(&sm).enumerate()?;
            let oracle = ConvergenceOracle::from_enumeration(&enumerated);
            if let Some(worst) = oracle.max_deviation(catalogue.source_model()) {
                let tolerance = ConvergenceOracle::tolerance(catalogue.source_model().len());
                metrics.max_frequency_deviation = Some(worst.deviation());
                if worst.deviation() > tolerance {
                    failures.push(format!(
                        "branch {}/{} sampled at {:.4}, expected {:.4} (tolerance {:.4})",
                        worst.branch_set_id, worst.branch_id, worst.observed, worst.expected, tolerance
                    ));
                }
            }
        }

        // GSIM resolution
        for rlz in catalogue.iter() {
            for region in scenario.regions() {
                if rlz.gsim_for_region(region).is_none() {
                    failures.push(format!("realization {} has no GSIM for {}", rlz.index(), region));
                }
            }
        }

        match scenario {
            ScenarioId::FourGmpe => {
                let gsims: Vec<&str> = catalogue
                    .iter()
                    .filter_map(|r| r.value_of(UncertaintyType::GmpeModel))
                    .collect();
                if gsims != FOUR_GMPE_NAMES {
                    failures.push(format!("GSIMs {:?}, expected {:?}", gsims, FOUR_GMPE_NAMES));
                }
                if catalogue.iter().any(|r| (r.weight() - 0.25).abs() > WEIGHT_SUM_TOLERANCE) {
                    failures.push("four-GMPE weights are not 0.25".to_string());
                }
            }
            ScenarioId::EmptyTree => {
                if let Some(rlz) = catalogue.get(0) {
                    if !rlz.source_model().path.is_empty() || !rlz.gsim().path.is_empty() {
                        failures.push("empty trees produced a non-empty path".to_string());
                    }
                }
            }
            _ => {}
        }

        if failures.is_empty() {
            debug!(
                "{}: {} realizations ({} x {}), {}",
                scenario.name(),
                metrics.realizations,
                metrics.source_model_paths,
                metrics.gsim_paths,
                catalogue.mode()
            );
        } else {
            warn!("{}: {} check(s) failed", scenario.name(), failures.len());
        }

        Ok((metrics, failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_four_gmpe_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::FourGmpe);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.realizations, 4);
        assert_eq!(result.metrics.warnings, 0);
    }

    #[test]
    fn test_every_scenario_passes() {
        let runner = ScenarioRunner::new(7).with_samples(500).with_workers(4);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_sampled_scenario_metrics() {
        let result = ScenarioRunner::new(42).with_samples(1000).run(ScenarioId::SampledMfd);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.realizations, 1000);
        assert!(result.metrics.max_frequency_deviation.unwrap() < 0.08);
    }

    #[test]
    fn test_sampled_catalogue_deterministic() {
        let a = ScenarioRunner::new(13).with_samples(100).catalogue(ScenarioId::SampledMfd).unwrap();
        let b = ScenarioRunner::new(13).with_samples(100).catalogue(ScenarioId::SampledMfd).unwrap();
        let c = ScenarioRunner::new(14).with_samples(100).catalogue(ScenarioId::SampledMfd).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_enumerated_scenarios_ignore_samples() {
        let job = ScenarioRunner::new(1).with_samples(50).job(ScenarioId::MultiRegion);
        assert_eq!(job.number_of_logic_tree_samples, 0);
        assert_eq!(job.ses_per_logic_tree_path, 1);
    }

    #[test]
    fn test_result_json_names_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::EmptyTree);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["scenario"], "empty_tree");
        assert_eq!(json["passed"], true);
        assert_eq!(json["metrics"]["realizations"], 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_sampled_mfd_any_seed(seed in any::<u64>(), workers in 1usize..6) {
            let result = ScenarioRunner::new(seed)
                .with_samples(400)
                .with_workers(workers)
                .run(ScenarioId::SampledMfd);
            prop_assert!(result.passed, "{:?}", result.failure_reason);
        }
    }
}
