//! Paths through a logic tree and the realizations built from them.

use crate::error::ValidationWarning;
use crate::tree::{ApplicabilityFilter, BranchNode, BranchSet, UncertaintyType};
use logictree_env::LogicTreeMode;
use serde::{Deserialize, Serialize};

/// One choice on a path: which branch was taken in which set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    pub branch_set_id: String,
    pub branch_id: String,
}

/// Ordered branch choices from root to leaf, one per traversed branch set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathStep>);

impl Path {
    /// The empty path (root).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Branch ids in path order.
    pub fn branch_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|step| step.branch_id.as_str())
    }

    /// Returns true if the branch was taken anywhere on the path.
    pub fn contains_branch(&self, branch_id: &str) -> bool {
        self.0.iter().any(|step| step.branch_id == branch_id)
    }

    pub(crate) fn push(&mut self, set: &BranchSet, branch: &BranchNode) {
        self.0.push(PathStep {
            branch_set_id: set.id().to_string(),
            branch_id: branch.id().to_string(),
        });
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.branch_ids().collect();
        write!(f, "{}", ids.join("_"))
    }
}

/// The concrete model a path selected in one branch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModel {
    pub uncertainty_type: UncertaintyType,
    pub branch_set_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<ApplicabilityFilter>,
    pub value: String,
}

/// A path being built by the enumerator or sampler.
#[derive(Debug, Clone)]
pub(crate) struct DrawnPath {
    pub path: Path,
    pub models: Vec<ResolvedModel>,
    /// Product of the weights of the branches taken
    pub weight: f64,
}

impl DrawnPath {
    pub fn root() -> Self {
        Self {
            path: Path::empty(),
            models: Vec::new(),
            weight: 1.0,
        }
    }

    pub fn take(&mut self, set: &BranchSet, branch: &BranchNode) {
        self.path.push(set, branch);
        self.models.push(ResolvedModel {
            uncertainty_type: set.uncertainty_type(),
            branch_set_id: set.id().to_string(),
            applies_to: set.filter().cloned(),
            value: branch.value().to_string(),
        });
        self.weight *= branch.weight();
    }

    pub fn into_realization(self, index: usize, weight: f64) -> Realization {
        Realization {
            index,
            path: self.path,
            weight,
            models: self.models,
        }
    }
}

/// A path stopped at a level where no branch set applied.
#[derive(Debug, Clone)]
pub(crate) struct Unresolved {
    pub level_id: String,
    pub path: Path,
    pub weight: f64,
}

impl Unresolved {
    /// `count` is the number of draws that stopped on this same path.
    pub fn into_warning(self, tree_id: &str, count: usize) -> ValidationWarning {
        ValidationWarning::IncompletePath {
            tree_id: tree_id.to_string(),
            level_id: self.level_id,
            path: self.path.to_string(),
            weight: self.weight,
            count,
        }
    }
}

// =============================================================================
// REALIZATION
// =============================================================================

/// One complete path through a tree with its probability weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Realization {
    /// Stable position in the owning catalogue
    pub index: usize,

    pub path: Path,

    /// Normalized weight (product of branch weights, or 1/N when sampled)
    pub weight: f64,

    /// Selected model per traversed branch set, in path order
    pub models: Vec<ResolvedModel>,
}

impl Realization {
    /// Models selected for an uncertainty type, in path order.
    pub fn models_of(&self, uncertainty_type: UncertaintyType) -> impl Iterator<Item = &ResolvedModel> {
        self.models
            .iter()
            .filter(move |m| m.uncertainty_type == uncertainty_type)
    }

    /// First model value selected for an uncertainty type.
    pub fn value_of(&self, uncertainty_type: UncertaintyType) -> Option<&str> {
        self.models_of(uncertainty_type).next().map(|m| m.value.as_str())
    }

    /// GSIM selected for a tectonic region type.
    ///
    /// A GMPE set filtered to that region wins over an unfiltered one.
    pub fn gsim_for_region(&self, trt: &str) -> Option<&str> {
        let mut fallback = None;
        for model in self.models_of(UncertaintyType::GmpeModel) {
            match &model.applies_to {
                Some(ApplicabilityFilter::TectonicRegionType(region)) if region == trt => {
                    return Some(model.value.as_str());
                }
                None if fallback.is_none() => fallback = Some(model.value.as_str()),
                _ => {}
            }
        }
        fallback
    }
}

// =============================================================================
// TREE REALIZATIONS
// =============================================================================

/// Realizations of one tree, in stable index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRealizations {
    tree_id: String,
    mode: LogicTreeMode,
    /// Paths attempted: samples drawn, or complete plus incomplete paths
    requested: usize,
    realizations: Vec<Realization>,
    warnings: Vec<ValidationWarning>,
}

impl TreeRealizations {
    pub(crate) fn new(
        tree_id: &str,
        mode: LogicTreeMode,
        requested: usize,
        realizations: Vec<Realization>,
        warnings: Vec<ValidationWarning>,
    ) -> Self {
        Self {
            tree_id: tree_id.to_string(),
            mode,
            requested,
            realizations,
            warnings,
        }
    }

    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    pub fn mode(&self) -> LogicTreeMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.realizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realizations.is_empty()
    }

    /// Paths attempted before incomplete ones were dropped.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Paths dropped at an unresolved level.
    pub fn dropped(&self) -> usize {
        self.requested - self.realizations.len()
    }

    pub fn get(&self, index: usize) -> Option<&Realization> {
        self.realizations.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Realization> {
        self.realizations.iter()
    }

    pub fn realizations(&self) -> &[Realization] {
        &self.realizations
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// Sum of realization weights (1.0 up to rounding).
    pub fn total_weight(&self) -> f64 {
        self.realizations.iter().map(|r| r.weight).sum()
    }
}

impl<'a> IntoIterator for &'a TreeRealizations {
    type Item = &'a Realization;
    type IntoIter = std::slice::Iter<'a, Realization>;

    fn into_iter(self) -> Self::IntoIter {
        self.realizations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gmpe_set(id: &str, trt: Option<&str>, gsim: &str) -> BranchSet {
        BranchSet::new(
            id,
            UncertaintyType::GmpeModel,
            vec![BranchNode::new(format!("{}_b1", id), gsim, 1.0)],
            trt.map(ApplicabilityFilter::tectonic_region),
        )
        .unwrap()
    }

    #[test]
    fn test_path_display_and_lookup() {
        let sm = BranchSet::new(
            "sm",
            UncertaintyType::SourceModel,
            vec![BranchNode::new("b1", "model.xml", 1.0)],
            None,
        )
        .unwrap();
        let gm = gmpe_set("gm", None, "Sadigh_et_al_1997");

        let mut drawn = DrawnPath::root();
        drawn.take(&sm, &sm.branches()[0]);
        drawn.take(&gm, &gm.branches()[0]);

        assert_eq!(drawn.path.to_string(), "b1_gm_b1");
        assert!(drawn.path.contains_branch("b1"));
        assert!(!drawn.path.contains_branch("b2"));
        assert_eq!(drawn.path.len(), 2);
        assert_eq!(drawn.weight, 1.0);
    }

    #[test]
    fn test_gsim_for_region_prefers_filtered_set() {
        let generic = gmpe_set("any", None, "Boore_et_al_1997");
        let asc = gmpe_set("asc", Some("Active Shallow Crust"), "Sadigh_et_al_1997");

        let mut drawn = DrawnPath::root();
        drawn.take(&generic, &generic.branches()[0]);
        drawn.take(&asc, &asc.branches()[0]);
        let rlz = drawn.into_realization(0, 1.0);

        assert_eq!(rlz.gsim_for_region("Active Shallow Crust"), Some("Sadigh_et_al_1997"));
        assert_eq!(rlz.gsim_for_region("Stable Continental Crust"), Some("Boore_et_al_1997"));
        assert_eq!(rlz.value_of(UncertaintyType::SourceModel), None);
        assert_eq!(rlz.models_of(UncertaintyType::GmpeModel).count(), 2);
    }

    #[test]
    fn test_gsim_for_unknown_region_without_fallback() {
        let asc = gmpe_set("asc", Some("Active Shallow Crust"), "Sadigh_et_al_1997");

        let mut drawn = DrawnPath::root();
        drawn.take(&asc, &asc.branches()[0]);
        let rlz = drawn.into_realization(0, 1.0);

        assert_eq!(rlz.gsim_for_region("Subduction Interface"), None);
    }
}
