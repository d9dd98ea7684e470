//! Logic-tree data model.
//!
//! A [`LogicTree`] is an ordered list of [`BranchingLevel`]s; each level holds
//! ordered [`BranchSet`]s; each set holds weighted [`BranchNode`]s. All types
//! are immutable once built and (de)serialize with the attribute names of
//! the logic-tree document (`logicTreeID`, `branchSetID`, `applyToSources`, ...).

use crate::error::{LogicTreeError, ValidationWarning};
use crate::validation::{self, WeightValidator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// UNCERTAINTY TYPE
// =============================================================================

/// Kind of epistemic uncertainty a branch set models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UncertaintyType {
    #[serde(rename = "sourceModel")]
    SourceModel,
    #[serde(rename = "sourceGeometry")]
    SourceGeometry,
    #[serde(rename = "sourceMfd")]
    SourceMfd,
    #[serde(rename = "gmpeModel")]
    GmpeModel,
    #[serde(rename = "maxMagGRRelative")]
    MaxMagGrRelative,
    #[serde(rename = "bGRRelative")]
    BGrRelative,
    #[serde(rename = "abGRAbsolute")]
    AbGrAbsolute,
    #[serde(rename = "maxMagGRAbsolute")]
    MaxMagGrAbsolute,
}

impl UncertaintyType {
    /// Returns every uncertainty type.
    pub fn all() -> Vec<UncertaintyType> {
        vec![
            UncertaintyType::SourceModel,
            UncertaintyType::SourceGeometry,
            UncertaintyType::SourceMfd,
            UncertaintyType::GmpeModel,
            UncertaintyType::MaxMagGrRelative,
            UncertaintyType::BGrRelative,
            UncertaintyType::AbGrAbsolute,
            UncertaintyType::MaxMagGrAbsolute,
        ]
    }

    /// Returns the document name.
    pub fn name(&self) -> &'static str {
        match self {
            UncertaintyType::SourceModel => "sourceModel",
            UncertaintyType::SourceGeometry => "sourceGeometry",
            UncertaintyType::SourceMfd => "sourceMfd",
            UncertaintyType::GmpeModel => "gmpeModel",
            UncertaintyType::MaxMagGrRelative => "maxMagGRRelative",
            UncertaintyType::BGrRelative => "bGRRelative",
            UncertaintyType::AbGrAbsolute => "abGRAbsolute",
            UncertaintyType::MaxMagGrAbsolute => "maxMagGRAbsolute",
        }
    }
}

impl std::fmt::Display for UncertaintyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for UncertaintyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UncertaintyType::all()
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown uncertainty type: {}", s))
    }
}

// =============================================================================
// APPLICABILITY FILTER
// =============================================================================

/// Where a branch set applies, as data.
///
/// Evaluated by [`crate::filter::BranchFilterEngine`]; there is no per-kind
/// behaviour attached to the variants themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ApplicabilityFilter {
    /// Applies to sources of one tectonic region type
    TectonicRegionType(String),

    /// Applies to the listed source ids
    SourceIds(BTreeSet<String>),

    /// Applies downstream of any of the listed branch ids
    AncestorBranches(BTreeSet<String>),
}

impl ApplicabilityFilter {
    /// Filter on a tectonic region type.
    pub fn tectonic_region(trt: impl Into<String>) -> Self {
        ApplicabilityFilter::TectonicRegionType(trt.into())
    }

    /// Filter on a set of source ids.
    pub fn sources<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ApplicabilityFilter::SourceIds(ids.into_iter().map(Into::into).collect())
    }

    /// Filter on a set of ancestor branch ids.
    pub fn ancestors<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ApplicabilityFilter::AncestorBranches(ids.into_iter().map(Into::into).collect())
    }

    /// Returns the document attribute name of this filter kind.
    pub fn attribute(&self) -> &'static str {
        match self {
            ApplicabilityFilter::TectonicRegionType(_) => "applyToTectonicRegionType",
            ApplicabilityFilter::SourceIds(_) => "applyToSources",
            ApplicabilityFilter::AncestorBranches(_) => "applyToBranches",
        }
    }
}

impl std::fmt::Display for ApplicabilityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicabilityFilter::TectonicRegionType(trt) => write!(f, "{}=\"{}\"", self.attribute(), trt),
            ApplicabilityFilter::SourceIds(ids) | ApplicabilityFilter::AncestorBranches(ids) => {
                let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
                write!(f, "{}=\"{}\"", self.attribute(), joined.join(" "))
            }
        }
    }
}

// =============================================================================
// BRANCH NODE
// =============================================================================

/// One weighted alternative within a branch set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchNode {
    #[serde(rename = "branchID")]
    id: String,

    /// Opaque model reference (GMPE name, source model file, MFD parameters...)
    #[serde(rename = "uncertaintyModel")]
    value: String,

    #[serde(rename = "uncertaintyWeight")]
    weight: f64,
}

impl BranchNode {
    pub fn new(id: impl Into<String>, value: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            weight,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

// =============================================================================
// BRANCH SET
// =============================================================================

/// Mutually exclusive weighted alternatives sharing one uncertainty type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BranchSetDocument", into = "BranchSetDocument")]
pub struct BranchSet {
    id: String,
    uncertainty_type: UncertaintyType,
    branches: Vec<BranchNode>,
    filter: Option<ApplicabilityFilter>,
}

impl BranchSet {
    /// Builds a branch set, rejecting bad weights and duplicate branch ids.
    pub fn new(
        id: impl Into<String>,
        uncertainty_type: UncertaintyType,
        branches: Vec<BranchNode>,
        filter: Option<ApplicabilityFilter>,
    ) -> Result<Self, LogicTreeError> {
        let set = Self::unchecked(id.into(), uncertainty_type, branches, filter)?;
        WeightValidator::default().check_set(None, &set)?;
        Ok(set)
    }

    /// Structural checks only; weights are left to the tree validator so that
    /// its errors carry the tree id.
    fn unchecked(
        id: String,
        uncertainty_type: UncertaintyType,
        branches: Vec<BranchNode>,
        filter: Option<ApplicabilityFilter>,
    ) -> Result<Self, LogicTreeError> {
        let mut seen = BTreeSet::new();
        for branch in &branches {
            if !seen.insert(branch.id()) {
                return Err(LogicTreeError::DuplicateId {
                    kind: "branch",
                    id: branch.id().to_string(),
                    scope: id,
                });
            }
        }

        match &filter {
            Some(ApplicabilityFilter::TectonicRegionType(trt)) if trt.trim().is_empty() => {
                return Err(LogicTreeError::InvalidFilter {
                    branch_set_id: id,
                    reason: "empty tectonic region type".to_string(),
                });
            }
            Some(ApplicabilityFilter::SourceIds(ids)) | Some(ApplicabilityFilter::AncestorBranches(ids))
                if ids.is_empty() =>
            {
                return Err(LogicTreeError::InvalidFilter {
                    branch_set_id: id,
                    reason: "empty id list".to_string(),
                });
            }
            _ => {}
        }

        Ok(Self {
            id,
            uncertainty_type,
            branches,
            filter,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uncertainty_type(&self) -> UncertaintyType {
        self.uncertainty_type
    }

    pub fn branches(&self) -> &[BranchNode] {
        &self.branches
    }

    pub fn filter(&self) -> Option<&ApplicabilityFilter> {
        self.filter.as_ref()
    }

    /// Sum of child weights.
    pub fn total_weight(&self) -> f64 {
        self.branches.iter().map(BranchNode::weight).sum()
    }

    /// Looks up a branch by id.
    pub fn branch(&self, id: &str) -> Option<&BranchNode> {
        self.branches.iter().find(|b| b.id == id)
    }
}

/// Document form of a branch set: filters are three optional attributes,
/// id lists are whitespace separated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchSetDocument {
    #[serde(rename = "branchSetID")]
    branch_set_id: String,
    uncertainty_type: UncertaintyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    apply_to_tectonic_region_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    apply_to_sources: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    apply_to_branches: Option<String>,
    #[serde(rename = "logicTreeBranches")]
    branches: Vec<BranchNode>,
}

impl TryFrom<BranchSetDocument> for BranchSet {
    type Error = LogicTreeError;

    fn try_from(doc: BranchSetDocument) -> Result<Self, Self::Error> {
        let mut filters = Vec::new();
        if let Some(trt) = doc.apply_to_tectonic_region_type {
            filters.push(ApplicabilityFilter::TectonicRegionType(trt.trim().to_string()));
        }
        if let Some(sources) = doc.apply_to_sources {
            filters.push(ApplicabilityFilter::sources(sources.split_whitespace()));
        }
        if let Some(branches) = doc.apply_to_branches {
            filters.push(ApplicabilityFilter::ancestors(branches.split_whitespace()));
        }

        if filters.len() > 1 {
            let attributes: Vec<&str> = filters.iter().map(ApplicabilityFilter::attribute).collect();
            return Err(LogicTreeError::InvalidFilter {
                branch_set_id: doc.branch_set_id,
                reason: format!("at most one filter attribute allowed, found {}", attributes.join(", ")),
            });
        }

        BranchSet::unchecked(doc.branch_set_id, doc.uncertainty_type, doc.branches, filters.pop())
    }
}

impl From<BranchSet> for BranchSetDocument {
    fn from(set: BranchSet) -> Self {
        let join = |ids: &BTreeSet<String>| ids.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
        let (trt, sources, branches) = match &set.filter {
            None => (None, None, None),
            Some(ApplicabilityFilter::TectonicRegionType(trt)) => (Some(trt.clone()), None, None),
            Some(ApplicabilityFilter::SourceIds(ids)) => (None, Some(join(ids)), None),
            Some(ApplicabilityFilter::AncestorBranches(ids)) => (None, None, Some(join(ids))),
        };

        Self {
            branch_set_id: set.id,
            uncertainty_type: set.uncertainty_type,
            apply_to_tectonic_region_type: trt,
            apply_to_sources: sources,
            apply_to_branches: branches,
            branches: set.branches,
        }
    }
}

// =============================================================================
// BRANCHING LEVEL
// =============================================================================

/// Branch sets applied at one depth of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchingLevel {
    #[serde(rename = "branchingLevelID")]
    id: String,

    #[serde(rename = "logicTreeBranchSets")]
    branch_sets: Vec<BranchSet>,
}

impl BranchingLevel {
    pub fn new(id: impl Into<String>, branch_sets: Vec<BranchSet>) -> Self {
        Self {
            id: id.into(),
            branch_sets,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn branch_sets(&self) -> &[BranchSet] {
        &self.branch_sets
    }
}

// =============================================================================
// LOGIC TREE
// =============================================================================

/// A full logic tree for one axis (source model or GSIM).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogicTreeDocument")]
pub struct LogicTree {
    #[serde(rename = "logicTreeID")]
    id: String,

    #[serde(rename = "logicTreeBranchingLevels")]
    levels: Vec<BranchingLevel>,
}

#[derive(Debug, Deserialize)]
struct LogicTreeDocument {
    #[serde(rename = "logicTreeID")]
    id: String,
    #[serde(rename = "logicTreeBranchingLevels", default)]
    levels: Vec<BranchingLevel>,
}

impl TryFrom<LogicTreeDocument> for LogicTree {
    type Error = LogicTreeError;

    fn try_from(doc: LogicTreeDocument) -> Result<Self, Self::Error> {
        LogicTree::new(doc.id, doc.levels)
    }
}

impl LogicTree {
    /// Builds a tree, failing fast on the first invalid branch set.
    pub fn new(id: impl Into<String>, levels: Vec<BranchingLevel>) -> Result<Self, LogicTreeError> {
        let tree = Self {
            id: id.into(),
            levels,
        };
        tree.validate()?;
        Ok(tree)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn levels(&self) -> &[BranchingLevel] {
        &self.levels
    }

    /// Iterates over every branch set in document order.
    pub fn branch_sets(&self) -> impl Iterator<Item = &BranchSet> {
        self.levels.iter().flat_map(|level| level.branch_sets.iter())
    }

    /// Looks up a branch set by id.
    pub fn branch_set(&self, id: &str) -> Option<&BranchSet> {
        self.branch_sets().find(|set| set.id == id)
    }

    /// Runs every structural check.
    ///
    /// Weight and id errors are fatal; unreachable filtered sets come back
    /// as warnings.
    pub fn validate(&self) -> Result<Vec<ValidationWarning>, LogicTreeError> {
        validation::validate_tree(self)
    }
}
