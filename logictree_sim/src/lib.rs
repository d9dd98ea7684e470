//! Logic-Tree Realization Harness
//!
//! This crate drives the logic-tree core end to end, the way a hazard job
//! would, and checks the resulting catalogues:
//! - **Loading**: tree documents (JSON rendering) and job parameters from disk
//! - **Scenarios**: built-in tree pairs with known outcomes
//! - **Runner**: builds each catalogue and checks weight sums, counts,
//!   same-seed determinism and worker-count independence
//! - **Oracle**: exact branch marginals from enumeration, used to judge
//!   whether sampled frequencies converge
//!
//! # Usage
//!
//! ```ignore
//! use logictree_sim::{ScenarioRunner, ScenarioId};
//!
//! let runner = ScenarioRunner::new(42).with_samples(1000);
//! let result = runner.run(ScenarioId::SampledMfd);
//! assert!(result.passed);
//! ```

mod exporter;
mod loader;
mod oracle;
mod runner;
pub mod scenarios;

pub use exporter::{CatalogueExport, ExportedRealization};
pub use loader::{load_job, load_tree, parse_job, parse_tree, HarnessError};
pub use oracle::{BranchDeviation, BranchKey, ConvergenceOracle};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
