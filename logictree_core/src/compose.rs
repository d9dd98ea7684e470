//! Composition of the source-model and GSIM logic trees.
//!
//! - both axes enumerated: full cross product, weights multiply
//! - both axes sampled with the same count: each axis is sampled with its
//!   own seed and samples are paired by position
//! - anything else is an axis mismatch

use crate::catalogue::RealizationCatalogue;
use crate::error::LogicTreeError;
use crate::filter::FilterContext;
use crate::sample::{RealizationSampler, SamplerConfig};
use crate::tree::LogicTree;
use logictree_env::{AxisParams, JobParams, LogicTreeMode};
use tracing::info;

/// A source-model tree and a GSIM tree processed together.
pub struct ComposedLogicTree<'a> {
    source_model: &'a LogicTree,
    gsim: &'a LogicTree,
    source_model_context: FilterContext,
    gsim_context: FilterContext,
    sampler: SamplerConfig,
}

impl<'a> ComposedLogicTree<'a> {
    pub fn new(source_model: &'a LogicTree, gsim: &'a LogicTree) -> Self {
        Self {
            source_model,
            gsim,
            source_model_context: FilterContext::tree_wide(),
            gsim_context: FilterContext::tree_wide(),
            sampler: SamplerConfig::default(),
        }
    }

    /// Restricts each axis to a source context.
    pub fn with_contexts(mut self, source_model: FilterContext, gsim: FilterContext) -> Self {
        self.source_model_context = source_model;
        self.gsim_context = gsim;
        self
    }

    pub fn with_sampler_config(mut self, config: SamplerConfig) -> Self {
        self.sampler = config;
        self
    }

    pub fn source_model(&self) -> &'a LogicTree {
        self.source_model
    }

    pub fn gsim(&self) -> &'a LogicTree {
        self.gsim
    }

    /// Decides how the two axes combine.
    pub fn mode(&self, source_model: &AxisParams, gsim: &AxisParams) -> Result<LogicTreeMode, LogicTreeError> {
        let sm = (self.source_model.id(), source_model.number_of_logic_tree_samples);
        let gs = (self.gsim.id(), gsim.number_of_logic_tree_samples);

        match (sm.1, gs.1) {
            (0, 0) => Ok(LogicTreeMode::Enumeration),
            (0, _) | (_, 0) => Err(LogicTreeError::axis_mismatch(
                sm,
                gs,
                "one axis is enumerated while the other is sampled",
            )),
            (a, b) if a != b => Err(LogicTreeError::axis_mismatch(
                sm,
                gs,
                "sampled axes must draw the same number of samples",
            )),
            (samples, _) => Ok(LogicTreeMode::Sampling { samples }),
        }
    }

    /// Builds the catalogue from explicit per-axis parameters.
    pub fn build(&self, source_model: &AxisParams, gsim: &AxisParams) -> Result<RealizationCatalogue, LogicTreeError> {
        let mode = self.mode(source_model, gsim)?;

        let sm = RealizationSampler::with_context(self.source_model, self.source_model_context.clone())
            .with_config(self.sampler)
            .sample(source_model.number_of_logic_tree_samples, source_model.random_seed)?;
        let gs = RealizationSampler::with_context(self.gsim, self.gsim_context.clone())
            .with_config(self.sampler)
            .sample(gsim.number_of_logic_tree_samples, gsim.random_seed)?;

        let catalogue = match mode {
            LogicTreeMode::Enumeration => RealizationCatalogue::cross_product(sm, gs),
            LogicTreeMode::Sampling { samples } => RealizationCatalogue::paired(samples, sm, gs),
        };

        info!(
            "Composed '{}' x '{}': {} realizations ({}), {} warnings",
            self.source_model.id(),
            self.gsim.id(),
            catalogue.len(),
            mode,
            catalogue.warnings().len()
        );

        Ok(catalogue)
    }

    /// Builds the catalogue from job parameters, deriving one seed per axis.
    pub fn build_for_job(&self, job: &JobParams) -> Result<RealizationCatalogue, LogicTreeError> {
        self.build(&job.source_model_axis(), &job.gsim_axis())
    }
}

// =============================================================================
// TESTS
// =============================================================================
