//! Logic-Tree Core - Epistemic Uncertainty Realizations for Hazard Jobs
//!
//! This library turns weighted, filtered logic trees into the catalogue of
//! realizations a hazard calculator iterates over:
//! 1. **Validation**: branch weights of every set sum to 1.0, ids are unique
//! 2. **Filtering**: branch sets apply by tectonic region, source id or ancestor branch
//! 3. **Enumeration**: every path, weighted by the product of its branch weights
//! 4. **Sampling**: N seeded Monte Carlo paths, weighted 1/N, parallel yet reproducible
//! 5. **Composition**: source-model tree x GSIM tree into one indexed catalogue

pub mod catalogue;
pub mod compose;
pub mod enumerate;
pub mod error;
pub mod filter;
pub mod realization;
pub mod sample;
pub mod tree;
pub mod validation;

// Re-export key types for convenience
pub use catalogue::{CompositeRealization, RealizationCatalogue, RealizationView};
pub use compose::ComposedLogicTree;
pub use enumerate::{Enumeration, RealizationEnumerator};
pub use error::{LogicTreeError, ValidationWarning};
pub use filter::{BranchFilterEngine, FilterContext, LevelResolution};
pub use realization::{Path, PathStep, Realization, ResolvedModel, TreeRealizations};
pub use sample::{RealizationSampler, SamplerConfig};
pub use tree::{ApplicabilityFilter, BranchNode, BranchSet, BranchingLevel, LogicTree, UncertaintyType};
pub use validation::{WeightValidator, WEIGHT_TOLERANCE};

pub use logictree_env::{AxisParams, DeterministicSeeds, JobParams, LogicTreeMode};
