//! Validation Module - Structural Checks Before Any Realization Is Built
//! =====================================================================
//!
//! Every tree goes through these checks before enumeration or sampling:
//! - Branch weights lie in (0, 1] and each set sums to 1.0 (±1e-6)
//! - Branch set ids are unique within the tree
//! - Ancestor filters reference branches that can precede them
//!
//! The first weight or id error aborts the whole tree. Filtered sets that
//! can never be reached are reported as warnings.

use crate::error::{LogicTreeError, ValidationWarning};
use crate::tree::{ApplicabilityFilter, BranchSet, LogicTree};
use std::collections::BTreeSet;
use tracing::debug;

/// Absolute tolerance on the sum of branch weights.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

// =============================================================================
// WEIGHT VALIDATOR
// =============================================================================

/// Checks branch set weights.
#[derive(Debug, Clone, Copy)]
pub struct WeightValidator {
    /// Allowed absolute deviation of a set's weight sum from 1.0
    tolerance: f64,
}

impl Default for WeightValidator {
    fn default() -> Self {
        Self::with_tolerance(WEIGHT_TOLERANCE)
    }
}

impl WeightValidator {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Fails if any weight is outside (0, 1] or the weights don't sum to 1.0.
    ///
    /// An empty set sums to 0 and fails as invalid weights.
    pub fn check_set(&self, tree_id: Option<&str>, set: &BranchSet) -> Result<(), LogicTreeError> {
        for branch in set.branches() {
            let weight = branch.weight();
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(LogicTreeError::InvalidBranchWeight {
                    tree_id: tree_id.map(str::to_string),
                    branch_set_id: set.id().to_string(),
                    branch_id: branch.id().to_string(),
                    weight,
                });
            }
        }

        let sum = set.total_weight();
        if (sum - 1.0).abs() > self.tolerance {
            return Err(LogicTreeError::InvalidWeights {
                tree_id: tree_id.map(str::to_string),
                branch_set_id: set.id().to_string(),
                sum,
            });
        }

        Ok(())
    }

    /// Checks every set of a tree, stopping at the first failure.
    pub fn check_tree(&self, tree: &LogicTree) -> Result<(), LogicTreeError> {
        tree.branch_sets()
            .try_for_each(|set| self.check_set(Some(tree.id()), set))
    }
}

// =============================================================================
// TREE VALIDATION
// =============================================================================

/// Runs weight, id and reachability checks on a tree.
pub fn validate_tree(tree: &LogicTree) -> Result<Vec<ValidationWarning>, LogicTreeError> {
    WeightValidator::default().check_tree(tree)?;
    check_unique_ids(tree)?;

    let warnings = unreachable_sets(tree);
    debug!(
        "Validated tree '{}': {} levels, {} branch sets, {} warnings",
        tree.id(),
        tree.levels().len(),
        tree.branch_sets().count(),
        warnings.len()
    );

    Ok(warnings)
}

fn check_unique_ids(tree: &LogicTree) -> Result<(), LogicTreeError> {
    let mut levels = BTreeSet::new();
    let mut sets = BTreeSet::new();

    for level in tree.levels() {
        if !levels.insert(level.id()) {
            return Err(LogicTreeError::DuplicateId {
                kind: "branching level",
                id: level.id().to_string(),
                scope: tree.id().to_string(),
            });
        }
        for set in level.branch_sets() {
            if !sets.insert(set.id()) {
                return Err(LogicTreeError::DuplicateId {
                    kind: "branch set",
                    id: set.id().to_string(),
                    scope: tree.id().to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Static reachability of ancestor filters.
///
/// A set filtered on ancestor branches is reachable if one of those branches
/// belongs to a reachable set at an earlier level. Sets at the same level
/// never see each other's branches. This over-approximates: a reachable set
/// may still be shadowed on every concrete path, which the enumerator reports.
fn unreachable_sets(tree: &LogicTree) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut available: BTreeSet<&str> = BTreeSet::new();

    for level in tree.levels() {
        let mut introduced = Vec::new();

        for set in level.branch_sets() {
            if let Some(ApplicabilityFilter::AncestorBranches(ids)) = set.filter() {
                if !ids.iter().any(|id| available.contains(id.as_str())) {
                    let listed: Vec<&str> = ids.iter().map(String::as_str).collect();
                    warnings.push(ValidationWarning::DeadBranchSet {
                        tree_id: tree.id().to_string(),
                        branch_set_id: set.id().to_string(),
                        reason: format!(
                            "none of [{}] is reachable before level '{}'",
                            listed.join(" "),
                            level.id()
                        ),
                    });
                    continue;
                }
            }
            introduced.extend(set.branches().iter().map(|b| b.id()));
        }

        available.extend(introduced);
    }

    warnings
}

// =============================================================================
// TESTS
// =============================================================================
