//! Logic-Tree Job Environment
//!
//! This crate holds the pieces of a hazard job that logic-tree processing
//! consumes from the outside world:
//! - **Job parameters**: `number_of_logic_tree_samples`, `random_seed`,
//!   `ses_per_logic_tree_path`, already resolved from the job descriptor
//! - **Randomness**: every pseudo-random stream is derived from a single
//!   64-bit seed, so any sampled catalogue is reproducible from its seed
//!
//! # Example
//!
//! ```ignore
//! use logictree_env::{JobParams, LogicTreeMode};
//!
//! let job = JobParams::from_pairs([
//!     ("number_of_logic_tree_samples", "0"),
//!     ("ses_per_logic_tree_path", "1"),
//! ])?;
//! assert_eq!(job.mode(), LogicTreeMode::Enumeration);
//! ```

mod error;
mod params;
mod seeds;

pub use error::EnvError;
pub use params::{AxisParams, JobParams, LogicTreeMode, DEFAULT_SES_PER_LOGIC_TREE_PATH};
pub use seeds::{DeterministicSeeds, GSIM_AXIS, SOURCE_MODEL_AXIS};
