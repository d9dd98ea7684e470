//! Branch set applicability.
//!
//! One function evaluates every filter kind against a [`FilterContext`] and
//! the path drawn so far. Per level, [`BranchFilterEngine::resolve_level`]
//! turns the applicable sets into the *active* ones:
//! - sets whose filters are disjoint are selected independently
//! - sets whose filters overlap are alternatives; the first in document
//!   order wins and the rest are shadowed

use crate::realization::Path;
use crate::tree::{ApplicabilityFilter, BranchSet, BranchingLevel};
use serde::{Deserialize, Serialize};

/// Domain attributes of the rupture source being evaluated.
///
/// An unset attribute is unbound: filters of that kind match it. The default
/// (everything unbound) walks the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterContext {
    /// Tectonic region type of the source
    pub tectonic_region: Option<String>,

    /// Id of the source
    pub source_id: Option<String>,
}

impl FilterContext {
    /// Context with no bound attributes.
    pub fn tree_wide() -> Self {
        Self::default()
    }

    /// Context bound to one tectonic region type.
    pub fn for_region(trt: impl Into<String>) -> Self {
        Self {
            tectonic_region: Some(trt.into()),
            source_id: None,
        }
    }

    /// Context bound to one source id.
    pub fn for_source(source_id: impl Into<String>) -> Self {
        Self {
            tectonic_region: None,
            source_id: Some(source_id.into()),
        }
    }

    /// Returns true when no attribute is bound.
    pub fn is_tree_wide(&self) -> bool {
        self.tectonic_region.is_none() && self.source_id.is_none()
    }
}

/// Outcome of resolving one branching level for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelResolution {
    /// Indices of the sets to branch over, in document order
    pub active: Vec<usize>,

    /// (shadowed set, winning set) index pairs
    pub shadowed: Vec<(usize, usize)>,
}

impl LevelResolution {
    /// True when nothing applies at this level.
    pub fn is_unresolved(&self) -> bool {
        self.active.is_empty()
    }
}

/// Evaluates applicability filters.
pub struct BranchFilterEngine;

impl BranchFilterEngine {
    /// Decides whether a branch set applies at this point of a path.
    pub fn is_applicable(set: &BranchSet, context: &FilterContext, ancestors: &Path) -> bool {
        match set.filter() {
            None => true,
            Some(ApplicabilityFilter::TectonicRegionType(trt)) => context
                .tectonic_region
                .as_ref()
                .map_or(true, |region| region == trt),
            Some(ApplicabilityFilter::SourceIds(ids)) => context
                .source_id
                .as_ref()
                .map_or(true, |source| ids.contains(source)),
            Some(ApplicabilityFilter::AncestorBranches(ids)) => {
                ancestors.branch_ids().any(|id| ids.contains(id))
            }
        }
    }

    /// Returns true if two filters may apply to the same source on the same path.
    ///
    /// Only two domain filters of the same kind with disjoint values are
    /// disjoint; every other pair overlaps.
    pub fn overlaps(a: Option<&ApplicabilityFilter>, b: Option<&ApplicabilityFilter>) -> bool {
        match (a, b) {
            (Some(ApplicabilityFilter::TectonicRegionType(x)), Some(ApplicabilityFilter::TectonicRegionType(y))) => x == y,
            (Some(ApplicabilityFilter::SourceIds(x)), Some(ApplicabilityFilter::SourceIds(y))) => {
                !x.is_disjoint(y)
            }
            _ => true,
        }
    }

    /// Selects the active branch sets of a level for a path.
    pub fn resolve_level(level: &BranchingLevel, context: &FilterContext, ancestors: &Path) -> LevelResolution {
        let sets = level.branch_sets();
        let mut resolution = LevelResolution::default();

        for (idx, set) in sets.iter().enumerate() {
            if !Self::is_applicable(set, context, ancestors) {
                continue;
            }

            let winner = resolution
                .active
                .iter()
                .copied()
                .find(|&active| Self::overlaps(sets[active].filter(), set.filter()));

            match winner {
                Some(winner) => resolution.shadowed.push((idx, winner)),
                None => resolution.active.push(idx),
            }
        }

        resolution
    }
}
