//! Seeded Monte Carlo sampling of a logic tree.
//!
//! Sample `i` draws from its own stream, `DeterministicSeeds::sample_rng(i)`,
//! so the drawn path depends only on (tree, seed, i). Indices are split into
//! disjoint contiguous ranges, one per worker, and the shards are merged in
//! range order. Worker count and scheduling never change the output.

use crate::enumerate::RealizationEnumerator;
use crate::error::{LogicTreeError, ValidationWarning};
use crate::filter::{BranchFilterEngine, FilterContext};
use crate::realization::{DrawnPath, Path, Realization, TreeRealizations, Unresolved};
use crate::tree::{BranchNode, BranchSet, LogicTree};
use logictree_env::{DeterministicSeeds, LogicTreeMode};
use rand::Rng;
use rayon::prelude::*;
use std::collections::hash_map::{Entry, HashMap};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Number of index shards; 0 uses the rayon pool size
    pub workers: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { workers: 0 }
    }
}

impl SamplerConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    /// Shard count actually used.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            rayon::current_num_threads().max(1)
        } else {
            self.workers
        }
    }
}

/// Draws weighted random paths through one tree.
pub struct RealizationSampler<'a> {
    tree: &'a LogicTree,
    context: FilterContext,
    config: SamplerConfig,
}

impl<'a> RealizationSampler<'a> {
    pub fn new(tree: &'a LogicTree) -> Self {
        Self::with_context(tree, FilterContext::tree_wide())
    }

    pub fn with_context(tree: &'a LogicTree, context: FilterContext) -> Self {
        Self {
            tree,
            context,
            config: SamplerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> SamplerConfig {
        self.config
    }

    /// Draws `samples` paths, each weighted 1/N.
    ///
    /// `samples == 0` means "enumerate everything" and ignores the seed.
    /// Otherwise a seed is mandatory: there is no fallback to entropy.
    pub fn sample(&self, samples: u32, seed: Option<u64>) -> Result<TreeRealizations, LogicTreeError> {
        if samples == 0 {
            debug!("Zero samples requested for tree '{}', enumerating", self.tree.id());
            return RealizationEnumerator::with_context(self.tree, self.context.clone()).enumerate();
        }

        let seed = seed.ok_or_else(|| LogicTreeError::SamplingSeedRequired {
            tree_id: self.tree.id().to_string(),
        })?;

        let mut warnings = self.tree.validate()?;
        let seeds = DeterministicSeeds::new(seed);
        let ranges = shard_ranges(samples as usize, self.config.effective_workers());
        let workers = ranges.len();

        let shards: Vec<Vec<Result<DrawnPath, Unresolved>>> = ranges
            .into_par_iter()
            .map(|range| {
                range
                    .map(|i| self.draw(&mut seeds.sample_rng(i as u64)))
                    .collect()
            })
            .collect();

        // Draws stopping on the same partial path share one warning
        let mut kept = Vec::with_capacity(samples as usize);
        let mut unresolved: Vec<(Unresolved, usize)> = Vec::new();
        let mut seen: HashMap<(String, Path), usize> = HashMap::new();
        for outcome in shards.into_iter().flatten() {
            match outcome {
                Ok(drawn) => kept.push(drawn),
                Err(stop) => match seen.entry((stop.level_id.clone(), stop.path.clone())) {
                    Entry::Occupied(slot) => unresolved[*slot.get()].1 += 1,
                    Entry::Vacant(slot) => {
                        slot.insert(unresolved.len());
                        unresolved.push((stop, 1));
                    }
                },
            }
        }

        if kept.is_empty() {
            let (level_id, path) = unresolved
                .first()
                .map(|(u, _)| (u.level_id.clone(), u.path.to_string()))
                .unwrap_or_default();
            return Err(LogicTreeError::UnresolvableFilter {
                tree_id: self.tree.id().to_string(),
                level_id,
                path,
            });
        }

        warnings.extend(
            unresolved
                .into_iter()
                .map(|(stop, count)| stop.into_warning(self.tree.id(), count)),
        );

        let dropped = samples as usize - kept.len();
        if dropped > 0 {
            warn!(
                "{} of {} samples of tree '{}' stopped at an unresolved level",
                dropped,
                samples,
                self.tree.id()
            );
        }
        for warning in warnings.iter().filter(|w| !matches!(w, ValidationWarning::IncompletePath { .. })) {
            warn!("{}", warning);
        }

        let weight = 1.0 / kept.len() as f64;
        let realizations: Vec<Realization> = kept
            .into_iter()
            .enumerate()
            .map(|(index, drawn)| drawn.into_realization(index, weight))
            .collect();

        info!(
            "Sampled {} realizations of tree '{}' (seed {}, {} shards)",
            realizations.len(),
            self.tree.id(),
            seed,
            workers
        );

        Ok(TreeRealizations::new(
            self.tree.id(),
            LogicTreeMode::Sampling { samples },
            samples as usize,
            realizations,
            warnings,
        ))
    }

    /// Draws one path: one branch per active set, level by level.
    ///
    /// Ancestor filters see only the branches drawn at earlier levels.
    fn draw<R: Rng>(&self, rng: &mut R) -> Result<DrawnPath, Unresolved> {
        let mut drawn = DrawnPath::root();

        for level in self.tree.levels() {
            let resolution = BranchFilterEngine::resolve_level(level, &self.context, &drawn.path);
            if resolution.is_unresolved() {
                return Err(Unresolved {
                    level_id: level.id().to_string(),
                    path: drawn.path,
                    weight: drawn.weight,
                });
            }

            for idx in resolution.active {
                let set = &level.branch_sets()[idx];
                drawn.take(set, choose_branch(set, rng));
            }
        }

        Ok(drawn)
    }
}

/// Picks a branch by cumulative-weight inversion of one uniform draw.
///
/// Panics on an empty set; validated sets never are.
pub fn choose_branch<'s, R: Rng>(set: &'s BranchSet, rng: &mut R) -> &'s BranchNode {
    let branches = set.branches();
    let target = rng.gen::<f64>() * set.total_weight();

    let mut cumulative = 0.0;
    for branch in branches {
        cumulative += branch.weight();
        if target < cumulative {
            return branch;
        }
    }

    // Rounding can leave target just above the last cumulative sum
    &branches[branches.len() - 1]
}

/// Splits `0..total` into `workers` contiguous ranges `[k*N/W, (k+1)*N/W)`.
///
/// The worker count is clamped to `1..=total`, so no range is empty unless
/// `total` is 0.
pub fn shard_ranges(total: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.clamp(1, total.max(1));
    (0..workers)
        .map(|k| (k * total / workers)..((k + 1) * total / workers))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
