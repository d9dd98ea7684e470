//! Built-in logic-tree scenarios.
//!
//! Each scenario is a (source-model tree, GSIM tree) pair with a known
//! expected outcome that the runner checks against.

use crate::loader::{parse_tree, HarnessError};
use logictree_core::{
    ApplicabilityFilter, BranchNode, BranchSet, BranchingLevel, LogicTree, LogicTreeError, UncertaintyType,
};

pub const ACTIVE_SHALLOW_CRUST: &str = "Active Shallow Crust";
pub const STABLE_CONTINENTAL_CRUST: &str = "Stable Continental Crust";
pub const SUBDUCTION_INTERFACE: &str = "Subduction Interface";

/// GSIM tree of the four-GMPE scenario, in document form.
pub const FOUR_GMPE_GSIM_JSON: &str = r#"{
    "logicTreeID": "lt1",
    "logicTreeBranchingLevels": [{
        "branchingLevelID": "bl1",
        "logicTreeBranchSets": [{
            "branchSetID": "bs1",
            "uncertaintyType": "gmpeModel",
            "applyToTectonicRegionType": "Active Shallow Crust",
            "logicTreeBranches": [
                {"branchID": "b1", "uncertaintyModel": "Boore_et_al_1997", "uncertaintyWeight": 0.25},
                {"branchID": "b2", "uncertaintyModel": "Sadigh_et_al_1997", "uncertaintyWeight": 0.25},
                {"branchID": "b3", "uncertaintyModel": "Abrahamson_Silva_1997", "uncertaintyWeight": 0.25},
                {"branchID": "b4", "uncertaintyModel": "Campbell_Bozorgnia_2003", "uncertaintyWeight": 0.25}
            ]
        }]
    }]
}"#;

/// GSIMs of the four-GMPE scenario, in branch order.
pub const FOUR_GMPE_NAMES: [&str; 4] = [
    "Boore_et_al_1997",
    "Sadigh_et_al_1997",
    "Abrahamson_Silva_1997",
    "Campbell_Bozorgnia_2003",
];

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// One source model, four equally weighted GMPEs for one region
    FourGmpe,

    /// Two source models, GMPE sets for three disjoint regions
    MultiRegion,

    /// Source models with ancestor- and source-filtered MFD branches
    SourceMfd,

    /// Trees without branching levels
    EmptyTree,

    /// The source MFD trees under seeded Monte Carlo sampling
    SampledMfd,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FourGmpe,
            ScenarioId::MultiRegion,
            ScenarioId::SourceMfd,
            ScenarioId::EmptyTree,
            ScenarioId::SampledMfd,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FourGmpe => "four_gmpe",
            ScenarioId::MultiRegion => "multi_region",
            ScenarioId::SourceMfd => "source_mfd",
            ScenarioId::EmptyTree => "empty_tree",
            ScenarioId::SampledMfd => "sampled_mfd",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FourGmpe => "1 source model x 4 GMPEs at 0.25 each for Active Shallow Crust",
            ScenarioId::MultiRegion => "2 source models x region-filtered GMPE sets for 3 tectonic regions",
            ScenarioId::SourceMfd => "MFD uncertainty selected by ancestor branch and source id",
            ScenarioId::EmptyTree => "no branching levels: one realization with weight 1.0",
            ScenarioId::SampledMfd => "Monte Carlo sampling of the source MFD trees",
        }
    }

    /// Returns true if the scenario samples instead of enumerating.
    pub fn is_sampled(&self) -> bool {
        matches!(self, ScenarioId::SampledMfd)
    }

    /// Builds the (source-model, GSIM) trees of the scenario.
    pub fn trees(&self) -> Result<(LogicTree, LogicTree), HarnessError> {
        let trees = match self {
            ScenarioId::FourGmpe => (
                single_source_model()?,
                parse_tree(FOUR_GMPE_GSIM_JSON, self.name())?,
            ),
            ScenarioId::MultiRegion => (two_source_models()?, regional_gsims()?),
            ScenarioId::SourceMfd | ScenarioId::SampledMfd => (source_mfd()?, regional_gsims()?),
            ScenarioId::EmptyTree => (LogicTree::new("lt_sm", vec![])?, LogicTree::new("lt_gsim", vec![])?),
        };
        Ok(trees)
    }

    /// Number of enumerated composite realizations.
    pub fn enumerated_count(&self) -> usize {
        match self {
            ScenarioId::FourGmpe => 4,
            // 2 source models x (2 ASC x 2 SCR x 1 interface)
            ScenarioId::MultiRegion => 2 * 4,
            // (2 + 3) MFD paths x 2 abGR branches x 4 GSIM paths
            ScenarioId::SourceMfd | ScenarioId::SampledMfd => 5 * 2 * 4,
            ScenarioId::EmptyTree => 1,
        }
    }

    /// Tectonic regions every realization must resolve a GSIM for.
    pub fn regions(&self) -> &'static [&'static str] {
        match self {
            ScenarioId::FourGmpe => &[ACTIVE_SHALLOW_CRUST],
            ScenarioId::EmptyTree => &[],
            _ => &[ACTIVE_SHALLOW_CRUST, STABLE_CONTINENTAL_CRUST, SUBDUCTION_INTERFACE],
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "four_gmpe" | "fourgmpe" => Ok(ScenarioId::FourGmpe),
            "multi_region" | "multiregion" => Ok(ScenarioId::MultiRegion),
            "source_mfd" | "sourcemfd" => Ok(ScenarioId::SourceMfd),
            "empty_tree" | "emptytree" | "empty" => Ok(ScenarioId::EmptyTree),
            "sampled_mfd" | "sampledmfd" => Ok(ScenarioId::SampledMfd),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

// =============================================================================
// TREE BUILDERS
// =============================================================================

fn set(
    id: &str,
    uncertainty_type: UncertaintyType,
    branches: &[(&str, &str, f64)],
    filter: Option<ApplicabilityFilter>,
) -> Result<BranchSet, LogicTreeError> {
    let nodes = branches
        .iter()
        .map(|(id, value, weight)| BranchNode::new(*id, *value, *weight))
        .collect();
    BranchSet::new(id, uncertainty_type, nodes, filter)
}

fn single_source_model() -> Result<LogicTree, LogicTreeError> {
    LogicTree::new(
        "lt_sm",
        vec![BranchingLevel::new(
            "bl1",
            vec![set(
                "sm",
                UncertaintyType::SourceModel,
                &[("b1", "source_model.xml", 1.0)],
                None,
            )?],
        )],
    )
}

fn two_source_models() -> Result<LogicTree, LogicTreeError> {
    LogicTree::new(
        "lt_sm",
        vec![BranchingLevel::new(
            "bl1",
            vec![set(
                "sm",
                UncertaintyType::SourceModel,
                &[
                    ("sm_area", "area_source_model.xml", 0.6),
                    ("sm_fault", "fault_source_model.xml", 0.4),
                ],
                None,
            )?],
        )],
    )
}

fn source_mfd() -> Result<LogicTree, LogicTreeError> {
    LogicTree::new(
        "lt_sm",
        vec![
            BranchingLevel::new(
                "bl1",
                vec![set(
                    "sm",
                    UncertaintyType::SourceModel,
                    &[
                        ("sm_area", "area_source_model.xml", 0.6),
                        ("sm_fault", "fault_source_model.xml", 0.4),
                    ],
                    None,
                )?],
            ),
            BranchingLevel::new(
                "bl2",
                vec![
                    set(
                        "mmax_area",
                        UncertaintyType::MaxMagGrRelative,
                        &[("mmax_minus", "-0.2", 0.3), ("mmax_plus", "+0.2", 0.7)],
                        Some(ApplicabilityFilter::ancestors(["sm_area"])),
                    )?,
                    set(
                        "bgr_fault",
                        UncertaintyType::BGrRelative,
                        &[("b_minus", "-0.1", 0.2), ("b_zero", "0.0", 0.6), ("b_plus", "+0.1", 0.2)],
                        Some(ApplicabilityFilter::ancestors(["sm_fault"])),
                    )?,
                ],
            ),
            BranchingLevel::new(
                "bl3",
                vec![set(
                    "abgr_src",
                    UncertaintyType::AbGrAbsolute,
                    &[("ab_low", "3.2 0.9", 0.5), ("ab_high", "3.6 1.0", 0.5)],
                    Some(ApplicabilityFilter::sources(["src_1", "src_2"])),
                )?],
            ),
        ],
    )
}

fn regional_gsims() -> Result<LogicTree, LogicTreeError> {
    LogicTree::new(
        "lt_gsim",
        vec![BranchingLevel::new(
            "bl1",
            vec![
                set(
                    "gm_asc",
                    UncertaintyType::GmpeModel,
                    &[("asc_1", "Sadigh_et_al_1997", 0.5), ("asc_2", "Boore_et_al_1997", 0.5)],
                    Some(ApplicabilityFilter::tectonic_region(ACTIVE_SHALLOW_CRUST)),
                )?,
                set(
                    "gm_scr",
                    UncertaintyType::GmpeModel,
                    &[("scr_1", "Toro_et_al_2002", 0.7), ("scr_2", "Campbell_2003", 0.3)],
                    Some(ApplicabilityFilter::tectonic_region(STABLE_CONTINENTAL_CRUST)),
                )?,
                set(
                    "gm_sif",
                    UncertaintyType::GmpeModel,
                    &[("sif_1", "Youngs_et_al_1997", 1.0)],
                    Some(ApplicabilityFilter::tectonic_region(SUBDUCTION_INTERFACE)),
                )?,
            ],
        )],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
            assert_eq!(id.to_string(), id.name());
        }
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_every_scenario_builds() {
        for id in ScenarioId::all() {
            let (sm, gsim) = id.trees().unwrap();
            assert_eq!(sm.validate().unwrap(), vec![], "{}", id);
            assert_eq!(gsim.validate().unwrap(), vec![], "{}", id);
        }
    }

    #[test]
    fn test_four_gmpe_document() {
        let (_, gsim) = ScenarioId::FourGmpe.trees().unwrap();
        let set = gsim.branch_set("bs1").unwrap();
        let names: Vec<&str> = set.branches().iter().map(|b| b.value()).collect();
        assert_eq!(names, FOUR_GMPE_NAMES);
    }
}
