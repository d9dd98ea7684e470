//! Full enumeration of a logic tree.
//!
//! Paths are produced lazily, depth first, in level order then branch set
//! order then branch order. Each path carries the product of the weights of
//! the branches it took.

use crate::error::{LogicTreeError, ValidationWarning};
use crate::filter::{BranchFilterEngine, FilterContext, LevelResolution};
use crate::realization::{DrawnPath, Realization, TreeRealizations, Unresolved};
use crate::tree::{BranchingLevel, LogicTree};
use logictree_env::LogicTreeMode;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Enumerates every realizable path of one tree.
pub struct RealizationEnumerator<'a> {
    tree: &'a LogicTree,
    context: FilterContext,
}

impl<'a> RealizationEnumerator<'a> {
    /// Enumerates the whole tree (no bound domain attributes).
    pub fn new(tree: &'a LogicTree) -> Self {
        Self::with_context(tree, FilterContext::tree_wide())
    }

    /// Enumerates the paths that apply to one source context.
    pub fn with_context(tree: &'a LogicTree, context: FilterContext) -> Self {
        Self { tree, context }
    }

    pub fn tree(&self) -> &'a LogicTree {
        self.tree
    }

    pub fn context(&self) -> &FilterContext {
        &self.context
    }

    /// Lazy walk over complete paths.
    ///
    /// Yielded weights are raw branch-weight products; paths that stop at an
    /// unresolved level are skipped and kept on the walk for inspection.
    pub fn iter(&self) -> Enumeration<'_> {
        Enumeration {
            tree: self.tree,
            context: &self.context,
            stack: vec![Frame {
                drawn: DrawnPath::root(),
                next_level: 0,
                pending: Vec::new(),
            }],
            next_index: 0,
            incomplete: Vec::new(),
            shadowed: Vec::new(),
            activated: BTreeSet::new(),
        }
    }

    /// Enumerates every path into a catalogue whose weights sum to 1.0.
    ///
    /// Incomplete paths are dropped with a warning and the survivors are
    /// renormalized. Fails with `UnresolvableFilter` when nothing survives.
    pub fn enumerate(&self) -> Result<TreeRealizations, LogicTreeError> {
        let mut warnings = self.tree.validate()?;

        let mut walk = self.iter();
        let mut realizations: Vec<Realization> = walk.by_ref().collect();

        if realizations.is_empty() {
            let (level_id, path) = walk
                .incomplete
                .first()
                .map(|u| (u.level_id.clone(), u.path.to_string()))
                .unwrap_or_default();
            return Err(LogicTreeError::UnresolvableFilter {
                tree_id: self.tree.id().to_string(),
                level_id,
                path,
            });
        }

        if !walk.incomplete.is_empty() {
            let kept: f64 = realizations.iter().map(|r| r.weight).sum();
            for realization in &mut realizations {
                realization.weight /= kept;
            }
        }

        let requested = realizations.len() + walk.incomplete_count();
        let observed = walk.into_warnings(&warnings);
        warnings.extend(observed);
        for warning in &warnings {
            warn!("{}", warning);
        }

        info!(
            "Enumerated {} realizations of tree '{}'",
            realizations.len(),
            self.tree.id()
        );

        Ok(TreeRealizations::new(
            self.tree.id(),
            LogicTreeMode::Enumeration,
            requested,
            realizations,
            warnings,
        ))
    }
}

/// Partial path on the DFS stack.
struct Frame {
    drawn: DrawnPath,

    /// Next level to resolve once `pending` is exhausted
    next_level: usize,

    /// Active sets of the current level still to branch over, reversed
    pending: Vec<usize>,
}

/// Lazy enumeration produced by [`RealizationEnumerator::iter`].
pub struct Enumeration<'a> {
    tree: &'a LogicTree,
    context: &'a FilterContext,
    stack: Vec<Frame>,
    next_index: usize,
    incomplete: Vec<Unresolved>,
    /// (level id, shadowed set id, winning set id), first occurrence only
    shadowed: Vec<(&'a str, &'a str, &'a str)>,
    activated: BTreeSet<&'a str>,
}

impl<'a> Enumeration<'a> {
    /// Number of paths that stopped at an unresolved level so far.
    pub fn incomplete_count(&self) -> usize {
        self.incomplete.len()
    }

    fn record(&mut self, level: &'a BranchingLevel, resolution: &LevelResolution) {
        let sets = level.branch_sets();
        for &idx in &resolution.active {
            self.activated.insert(sets[idx].id());
        }
        for &(shadowed, winner) in &resolution.shadowed {
            let id = sets[shadowed].id();
            if !self.shadowed.iter().any(|(_, seen, _)| *seen == id) {
                self.shadowed.push((level.id(), id, sets[winner].id()));
            }
        }
    }

    /// Turns what the walk observed into warnings, skipping sets already
    /// reported in `known`.
    fn into_warnings(self, known: &[ValidationWarning]) -> Vec<ValidationWarning> {
        let tree_id = self.tree.id();
        let mut reported: BTreeSet<&str> = known
            .iter()
            .filter_map(|w| match w {
                ValidationWarning::DeadBranchSet { branch_set_id, .. } => Some(branch_set_id.as_str()),
                _ => None,
            })
            .collect();

        let mut warnings: Vec<ValidationWarning> = self
            .incomplete
            .into_iter()
            .map(|u| u.into_warning(tree_id, 1))
            .collect();

        for (level_id, set_id, winner) in &self.shadowed {
            reported.insert(*set_id);
            warnings.push(ValidationWarning::ShadowedBranchSet {
                tree_id: tree_id.to_string(),
                level_id: level_id.to_string(),
                branch_set_id: set_id.to_string(),
                shadowed_by: winner.to_string(),
            });
        }

        // With a bound context, filtered-out sets are expected to stay idle
        if self.context.is_tree_wide() {
            for set in self.tree.branch_sets() {
                if !self.activated.contains(set.id()) && !reported.contains(set.id()) {
                    warnings.push(ValidationWarning::DeadBranchSet {
                        tree_id: tree_id.to_string(),
                        branch_set_id: set.id().to_string(),
                        reason: "not active on any enumerated path".to_string(),
                    });
                }
            }
        }

        warnings
    }
}

impl<'a> Iterator for Enumeration<'a> {
    type Item = Realization;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let levels = tree.levels();

        while let Some(mut frame) = self.stack.pop() {
            if let Some(set_idx) = frame.pending.pop() {
                let set = &levels[frame.next_level - 1].branch_sets()[set_idx];
                for branch in set.branches().iter().rev() {
                    let mut drawn = frame.drawn.clone();
                    drawn.take(set, branch);
                    self.stack.push(Frame {
                        drawn,
                        next_level: frame.next_level,
                        pending: frame.pending.clone(),
                    });
                }
                continue;
            }

            if frame.next_level == levels.len() {
                let index = self.next_index;
                self.next_index += 1;
                let weight = frame.drawn.weight;
                return Some(frame.drawn.into_realization(index, weight));
            }

            let level = &levels[frame.next_level];
            let resolution = BranchFilterEngine::resolve_level(level, self.context, &frame.drawn.path);
            self.record(level, &resolution);

            if resolution.is_unresolved() {
                debug!(
                    "Path [{}] of tree '{}' stops at level '{}'",
                    frame.drawn.path,
                    self.tree.id(),
                    level.id()
                );
                self.incomplete.push(Unresolved {
                    level_id: level.id().to_string(),
                    path: frame.drawn.path,
                    weight: frame.drawn.weight,
                });
                continue;
            }

            frame.pending = resolution.active.into_iter().rev().collect();
            frame.next_level += 1;
            self.stack.push(frame);
        }

        None
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ApplicabilityFilter, BranchNode, BranchSet, UncertaintyType};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const ASC: &str = "Active Shallow Crust";
    const SCR: &str = "Stable Continental Crust";

    fn set(id: &str, ut: UncertaintyType, branches: &[(&str, &str, f64)], filter: Option<ApplicabilityFilter>) -> BranchSet {
        let nodes = branches
            .iter()
            .map(|(bid, value, w)| BranchNode::new(*bid, *value, *w))
            .collect();
        BranchSet::new(id, ut, nodes, filter).unwrap()
    }

    fn four_gmpe() -> LogicTree {
        LogicTree::new(
            "lt1",
            vec![BranchingLevel::new(
                "bl1",
                vec![set(
                    "bs1",
                    UncertaintyType::GmpeModel,
                    &[
                        ("b1", "Boore_et_al_1997", 0.25),
                        ("b2", "Sadigh_et_al_1997", 0.25),
                        ("b3", "Abrahamson_Silva_1997", 0.25),
                        ("b4", "Campbell_Bozorgnia_2003", 0.25),
                    ],
                    Some(ApplicabilityFilter::tectonic_region(ASC)),
                )],
            )],
        )
        .unwrap()
    }

    /// Two source models, each with its own MFD set selected by ancestor.
    fn source_mfd() -> LogicTree {
        LogicTree::new(
            "sm",
            vec![
                BranchingLevel::new(
                    "bl1",
                    vec![set(
                        "sm",
                        UncertaintyType::SourceModel,
                        &[("sm_a", "a.xml", 0.6), ("sm_b", "b.xml", 0.4)],
                        None,
                    )],
                ),
                BranchingLevel::new(
                    "bl2",
                    vec![
                        set(
                            "mfd_a",
                            UncertaintyType::MaxMagGrRelative,
                            &[("mmax_lo", "-0.2", 0.5), ("mmax_hi", "+0.2", 0.5)],
                            Some(ApplicabilityFilter::ancestors(["sm_a"])),
                        ),
                        set(
                            "mfd_b",
                            UncertaintyType::BGrRelative,
                            &[("b_lo", "-0.1", 0.3), ("b_mid", "0.0", 0.4), ("b_hi", "+0.1", 0.3)],
                            Some(ApplicabilityFilter::ancestors(["sm_b"])),
                        ),
                    ],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_four_gmpe_enumeration() {
        let tree = four_gmpe();
        let result = RealizationEnumerator::new(&tree).enumerate().unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(result.mode(), LogicTreeMode::Enumeration);
        let gsims: Vec<&str> = result
            .iter()
            .map(|r| r.value_of(UncertaintyType::GmpeModel).unwrap())
            .collect();
        assert_eq!(
            gsims,
            vec!["Boore_et_al_1997", "Sadigh_et_al_1997", "Abrahamson_Silva_1997", "Campbell_Bozorgnia_2003"]
        );
        for (i, rlz) in result.iter().enumerate() {
            assert_eq!(rlz.index, i);
            assert_relative_eq!(rlz.weight, 0.25);
        }
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn test_zero_levels_single_empty_path() {
        let tree = LogicTree::new("empty", vec![]).unwrap();
        let result = RealizationEnumerator::new(&tree).enumerate().unwrap();

        assert_eq!(result.len(), 1);
        let rlz = result.get(0).unwrap();
        assert!(rlz.path.is_empty());
        assert_eq!(rlz.weight, 1.0);
        assert!(rlz.models.is_empty());
    }

    #[test]
    fn test_ancestor_filters_follow_path() {
        let tree = source_mfd();
        let result = RealizationEnumerator::new(&tree).enumerate().unwrap();

        let paths: Vec<String> = result.iter().map(|r| r.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["sm_a_mmax_lo", "sm_a_mmax_hi", "sm_b_b_lo", "sm_b_b_mid", "sm_b_b_hi"]
        );

        let weights: Vec<f64> = result.iter().map(|r| r.weight).collect();
        for (got, want) in weights.iter().zip([0.3, 0.3, 0.12, 0.16, 0.12]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        assert_relative_eq!(result.total_weight(), 1.0, epsilon = 1e-9);
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn test_disjoint_regions_multiply() {
        let tree = LogicTree::new(
            "gsim",
            vec![BranchingLevel::new(
                "bl1",
                vec![
                    set(
                        "asc",
                        UncertaintyType::GmpeModel,
                        &[("a1", "Sadigh_et_al_1997", 0.5), ("a2", "Boore_et_al_1997", 0.5)],
                        Some(ApplicabilityFilter::tectonic_region(ASC)),
                    ),
                    set(
                        "scr",
                        UncertaintyType::GmpeModel,
                        &[("s1", "Toro_2002", 0.7), ("s2", "Campbell_2003", 0.3)],
                        Some(ApplicabilityFilter::tectonic_region(SCR)),
                    ),
                ],
            )],
        )
        .unwrap();

        let wide = RealizationEnumerator::new(&tree).enumerate().unwrap();
        assert_eq!(wide.len(), 4);
        assert_relative_eq!(wide.total_weight(), 1.0, epsilon = 1e-12);
        let first = wide.get(0).unwrap();
        assert_eq!(first.gsim_for_region(ASC), Some("Sadigh_et_al_1997"));
        assert_eq!(first.gsim_for_region(SCR), Some("Toro_2002"));

        // Bound to one region, the other set is never selected
        let scr_only = RealizationEnumerator::with_context(&tree, FilterContext::for_region(SCR))
            .enumerate()
            .unwrap();
        assert_eq!(scr_only.len(), 2);
        for rlz in &scr_only {
            assert!(rlz.models.iter().all(|m| m.branch_set_id == "scr"));
            assert_eq!(rlz.gsim_for_region(ASC), None);
        }
        assert!(scr_only.warnings().is_empty());
    }

    #[test]
    fn test_shadowed_set_warns() {
        let tree = LogicTree::new(
            "gsim",
            vec![BranchingLevel::new(
                "bl1",
                vec![
                    set("any", UncertaintyType::GmpeModel, &[("g1", "Boore_et_al_1997", 1.0)], None),
                    set(
                        "asc",
                        UncertaintyType::GmpeModel,
                        &[("g2", "Sadigh_et_al_1997", 1.0)],
                        Some(ApplicabilityFilter::tectonic_region(ASC)),
                    ),
                ],
            )],
        )
        .unwrap();

        let result = RealizationEnumerator::new(&tree).enumerate().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result.warnings(),
            &[ValidationWarning::ShadowedBranchSet {
                tree_id: "gsim".to_string(),
                level_id: "bl1".to_string(),
                branch_set_id: "asc".to_string(),
                shadowed_by: "any".to_string(),
            }]
        );
    }

    #[test]
    fn test_incomplete_paths_renormalized() {
        // Only sm_a has a follow-up set at bl2
        let tree = LogicTree::new(
            "sm",
            vec![
                BranchingLevel::new(
                    "bl1",
                    vec![set(
                        "sm",
                        UncertaintyType::SourceModel,
                        &[("sm_a", "a.xml", 0.75), ("sm_b", "b.xml", 0.25)],
                        None,
                    )],
                ),
                BranchingLevel::new(
                    "bl2",
                    vec![set(
                        "mfd_a",
                        UncertaintyType::MaxMagGrRelative,
                        &[("lo", "-0.2", 0.5), ("hi", "+0.2", 0.5)],
                        Some(ApplicabilityFilter::ancestors(["sm_a"])),
                    )],
                ),
            ],
        )
        .unwrap();

        let enumerator = RealizationEnumerator::new(&tree);
        let mut walk = enumerator.iter();
        assert_eq!(walk.by_ref().count(), 2);
        assert_eq!(walk.incomplete_count(), 1);

        let result = enumerator.enumerate().unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.requested(), 3);
        assert_eq!(result.dropped(), 1);
        for rlz in &result {
            assert_relative_eq!(rlz.weight, 0.5, epsilon = 1e-12);
        }
        assert!(matches!(
            &result.warnings()[0],
            ValidationWarning::IncompletePath { level_id, path, weight, .. }
                if level_id == "bl2" && path == "sm_b" && *weight == 0.25
        ));
    }

    #[test]
    fn test_nothing_applies_is_unresolvable() {
        let tree = four_gmpe();
        let err = RealizationEnumerator::with_context(&tree, FilterContext::for_region(SCR))
            .enumerate()
            .unwrap_err();

        assert_eq!(
            err,
            LogicTreeError::UnresolvableFilter {
                tree_id: "lt1".to_string(),
                level_id: "bl1".to_string(),
                path: String::new(),
            }
        );
    }

    #[test]
    fn test_shadowed_set_not_reported_dead() {
        // mfd_x overlaps the unfiltered geometry set at bl2
        let tree = LogicTree::new(
            "sm",
            vec![
                BranchingLevel::new(
                    "bl1",
                    vec![set("sm", UncertaintyType::SourceModel, &[("sm_a", "a.xml", 1.0)], None)],
                ),
                BranchingLevel::new(
                    "bl2",
                    vec![
                        set("geom", UncertaintyType::SourceGeometry, &[("g1", "dip=30", 1.0)], None),
                        set(
                            "mfd_x",
                            UncertaintyType::SourceMfd,
                            &[("m1", "tgr", 1.0)],
                            Some(ApplicabilityFilter::ancestors(["sm_a"])),
                        ),
                    ],
                ),
            ],
        )
        .unwrap();

        let result = RealizationEnumerator::new(&tree).enumerate().unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.warnings().iter().any(|w| matches!(
            w,
            ValidationWarning::ShadowedBranchSet { branch_set_id, .. } if branch_set_id == "mfd_x"
        )));
        assert!(!result.warnings().iter().any(|w| matches!(w, ValidationWarning::DeadBranchSet { .. })));
    }

    #[test]
    fn test_set_behind_shadowed_branch_is_dead() {
        // anc_z is reachable on paper through z, but z's set loses to sm
        let tree = LogicTree::new(
            "sm",
            vec![
                BranchingLevel::new(
                    "bl1",
                    vec![
                        set("sm", UncertaintyType::SourceModel, &[("a", "a.xml", 1.0)], None),
                        set("sm2", UncertaintyType::SourceModel, &[("z", "z.xml", 1.0)], None),
                    ],
                ),
                BranchingLevel::new(
                    "bl2",
                    vec![
                        set(
                            "anc_z",
                            UncertaintyType::SourceMfd,
                            &[("x", "tgr", 1.0)],
                            Some(ApplicabilityFilter::ancestors(["z"])),
                        ),
                        set("generic", UncertaintyType::SourceGeometry, &[("n", "dip=45", 1.0)], None),
                    ],
                ),
            ],
        )
        .unwrap();
        assert!(tree.validate().unwrap().is_empty());

        let result = RealizationEnumerator::new(&tree).enumerate().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(0).unwrap().path.to_string(), "a_n");
        assert_eq!(
            result.warnings(),
            &[
                ValidationWarning::ShadowedBranchSet {
                    tree_id: "sm".to_string(),
                    level_id: "bl1".to_string(),
                    branch_set_id: "sm2".to_string(),
                    shadowed_by: "sm".to_string(),
                },
                ValidationWarning::DeadBranchSet {
                    tree_id: "sm".to_string(),
                    branch_set_id: "anc_z".to_string(),
                    reason: "not active on any enumerated path".to_string(),
                },
            ]
        );

        // Bound to a source, idle sets are expected and not reported dead
        let bound = RealizationEnumerator::with_context(&tree, FilterContext::for_source("src_1"))
            .enumerate()
            .unwrap();
        assert!(!bound.warnings().iter().any(|w| matches!(w, ValidationWarning::DeadBranchSet { .. })));
    }

    #[test]
    fn test_lazy_walk_matches_enumerate() {
        let tree = source_mfd();
        let enumerator = RealizationEnumerator::new(&tree);

        let first_two: Vec<Realization> = enumerator.iter().take(2).collect();
        let all = enumerator.enumerate().unwrap();
        assert_eq!(first_two.as_slice(), &all.realizations()[..2]);
    }

    fn weights(raw: &[f64]) -> Vec<f64> {
        let total: f64 = raw.iter().sum();
        raw.iter().map(|w| w / total).collect()
    }

    proptest! {
        #[test]
        fn test_enumeration_weights_sum_to_one(
            raw_levels in prop::collection::vec(prop::collection::vec(0.05f64..1.0, 1..5), 0..4)
        ) {
            let levels: Vec<BranchingLevel> = raw_levels
                .iter()
                .enumerate()
                .map(|(l, raw)| {
                    let nodes = weights(raw)
                        .into_iter()
                        .enumerate()
                        .map(|(b, w)| BranchNode::new(format!("l{}b{}", l, b), format!("m{}", b), w))
                        .collect();
                    let set = BranchSet::new(format!("bs{}", l), UncertaintyType::SourceModel, nodes, None).unwrap();
                    BranchingLevel::new(format!("bl{}", l), vec![set])
                })
                .collect();
            let tree = LogicTree::new("prop", levels).unwrap();

            let result = RealizationEnumerator::new(&tree).enumerate().unwrap();
            let expected: usize = raw_levels.iter().map(Vec::len).product();

            prop_assert_eq!(result.len(), expected);
            prop_assert!((result.total_weight() - 1.0).abs() < 1e-9);
        }
    }
}
