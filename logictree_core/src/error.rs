//! Error and warning types for logic-tree processing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal logic-tree processing errors.
///
/// Every variant names the tree, branch set or branching level it concerns.
/// None of these are transient, so nothing is ever retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogicTreeError {
    /// Child weights of a branch set do not sum to 1.0
    #[error("Invalid weights: branch set '{branch_set_id}'{} sums to {sum}, expected 1.0", tree_scope(.tree_id))]
    InvalidWeights {
        tree_id: Option<String>,
        branch_set_id: String,
        sum: f64,
    },

    /// A single branch weight lies outside (0, 1]
    #[error("Invalid weight: branch '{branch_id}' of branch set '{branch_set_id}'{} has weight {weight}", tree_scope(.tree_id))]
    InvalidBranchWeight {
        tree_id: Option<String>,
        branch_set_id: String,
        branch_id: String,
        weight: f64,
    },

    /// An id that must be unique appears twice
    #[error("Duplicate {kind} id '{id}' in '{scope}'")]
    DuplicateId {
        kind: &'static str,
        id: String,
        scope: String,
    },

    /// Malformed applicability filter attributes
    #[error("Invalid filter on branch set '{branch_set_id}': {reason}")]
    InvalidFilter {
        branch_set_id: String,
        reason: String,
    },

    /// No branch set applies at a level for a path
    #[error("Unresolvable filter: no branch set of level '{level_id}' in tree '{tree_id}' applies after path [{path}]")]
    UnresolvableFilter {
        tree_id: String,
        level_id: String,
        path: String,
    },

    /// The two axes of a composed tree cannot be paired
    #[error("Axis mismatch: source-model tree '{source_model_tree_id}' has {source_model_samples} samples, GSIM tree '{gsim_tree_id}' has {gsim_samples}: {reason}")]
    AxisMismatch {
        source_model_tree_id: String,
        source_model_samples: u32,
        gsim_tree_id: String,
        gsim_samples: u32,
        reason: String,
    },

    /// Sampling requested without a reproducible seed
    #[error("Sampling seed required for tree '{tree_id}'")]
    SamplingSeedRequired { tree_id: String },
}

fn tree_scope(tree_id: &Option<String>) -> String {
    match tree_id {
        Some(id) => format!(" in tree '{}'", id),
        None => String::new(),
    }
}

impl LogicTreeError {
    /// Creates an axis mismatch error.
    ///
    /// Each axis is given as (tree id, sample count).
    pub fn axis_mismatch(source_model: (&str, u32), gsim: (&str, u32), reason: impl Into<String>) -> Self {
        LogicTreeError::AxisMismatch {
            source_model_tree_id: source_model.0.to_string(),
            source_model_samples: source_model.1,
            gsim_tree_id: gsim.0.to_string(),
            gsim_samples: gsim.1,
            reason: reason.into(),
        }
    }
}

/// Non-fatal findings returned alongside a usable catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// A filtered branch set can never be selected
    DeadBranchSet {
        tree_id: String,
        branch_set_id: String,
        reason: String,
    },

    /// A branch set overlaps an earlier set at the same level and loses to it
    ShadowedBranchSet {
        tree_id: String,
        level_id: String,
        branch_set_id: String,
        shadowed_by: String,
    },

    /// A path stopped at a level with no applicable branch set
    IncompletePath {
        tree_id: String,
        level_id: String,
        path: String,
        weight: f64,
        /// Draws that stopped on this same partial path (1 when enumerating)
        count: usize,
    },

    /// Sampled axes ended up with different sizes and were truncated to pair
    UnpairedSamples { source_model: usize, gsim: usize },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::DeadBranchSet { tree_id, branch_set_id, reason } => {
                write!(f, "dead branch set '{}' in tree '{}': {}", branch_set_id, tree_id, reason)
            }
            ValidationWarning::ShadowedBranchSet { tree_id, level_id, branch_set_id, shadowed_by } => write!(
                f,
                "branch set '{}' at level '{}' of tree '{}' is shadowed by '{}'",
                branch_set_id, level_id, tree_id, shadowed_by
            ),
            ValidationWarning::IncompletePath { tree_id, level_id, path, weight, count: 1 } => write!(
                f,
                "path [{}] of tree '{}' stops at level '{}' (weight {:.6} dropped)",
                path, tree_id, level_id, weight
            ),
            ValidationWarning::IncompletePath { tree_id, level_id, path, count, .. } => write!(
                f,
                "path [{}] of tree '{}' stops at level '{}' ({} draws dropped)",
                path, tree_id, level_id, count
            ),
            ValidationWarning::UnpairedSamples { source_model, gsim } => write!(
                f,
                "{} source-model samples paired with {} GSIM samples",
                source_model, gsim
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_ids() {
        let err = LogicTreeError::UnresolvableFilter {
            tree_id: "lt1".to_string(),
            level_id: "bl2".to_string(),
            path: "b1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lt1") && msg.contains("bl2") && msg.contains("b1"));

        let warning = ValidationWarning::ShadowedBranchSet {
            tree_id: "lt1".to_string(),
            level_id: "bl1".to_string(),
            branch_set_id: "bs2".to_string(),
            shadowed_by: "bs1".to_string(),
        };
        assert!(warning.to_string().contains("shadowed by 'bs1'"));

        let err = LogicTreeError::axis_mismatch(("lt_sm", 0), ("lt_gsim", 10), "one axis is enumerated");
        let msg = err.to_string();
        assert!(msg.contains("'lt_sm'") && msg.contains("'lt_gsim'"));
    }

    #[test]
    fn test_incomplete_path_message_counts_draws() {
        let single = ValidationWarning::IncompletePath {
            tree_id: "sm".to_string(),
            level_id: "bl2".to_string(),
            path: "sm_b".to_string(),
            weight: 0.25,
            count: 1,
        };
        assert!(single.to_string().contains("weight 0.250000 dropped"));

        let repeated = ValidationWarning::IncompletePath {
            tree_id: "sm".to_string(),
            level_id: "bl2".to_string(),
            path: "sm_b".to_string(),
            weight: 0.25,
            count: 48,
        };
        assert!(repeated.to_string().contains("48 draws dropped"));
    }
}
