//! Ground truth oracle for sampled catalogues.
//!
//! The oracle holds the exact marginal probability of every branch, taken
//! from a full enumeration of the same tree. A sampled catalogue is judged by
//! how far its empirical branch frequencies drift from those marginals.

use logictree_core::TreeRealizations;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of one branch: (branch set id, branch id).
pub type BranchKey = (String, String);

/// Largest drift observed for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDeviation {
    pub branch_set_id: String,
    pub branch_id: String,
    pub expected: f64,
    pub observed: f64,
}

impl BranchDeviation {
    pub fn deviation(&self) -> f64 {
        (self.observed - self.expected).abs()
    }
}

/// Exact branch marginals of one tree.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceOracle {
    marginals: BTreeMap<BranchKey, f64>,
}

impl ConvergenceOracle {
    /// Builds marginals from an enumerated catalogue.
    pub fn from_enumeration(enumerated: &TreeRealizations) -> Self {
        Self {
            marginals: branch_mass(enumerated),
        }
    }

    /// Probability that a path takes the branch.
    pub fn marginal(&self, branch_set_id: &str, branch_id: &str) -> Option<f64> {
        self.marginals
            .get(&(branch_set_id.to_string(), branch_id.to_string()))
            .copied()
    }

    pub fn marginals(&self) -> &BTreeMap<BranchKey, f64> {
        &self.marginals
    }

    /// Empirical branch frequencies of a catalogue (weighted by realization).
    pub fn observed(&self, sampled: &TreeRealizations) -> BTreeMap<BranchKey, f64> {
        branch_mass(sampled)
    }

    /// The branch whose sampled frequency is furthest from its marginal.
    ///
    /// Branches never drawn count with frequency 0.
    pub fn max_deviation(&self, sampled: &TreeRealizations) -> Option<BranchDeviation> {
        let observed = self.observed(sampled);

        self.marginals
            .iter()
            .map(|((set, branch), expected)| BranchDeviation {
                branch_set_id: set.clone(),
                branch_id: branch.clone(),
                expected: *expected,
                observed: observed.get(&(set.clone(), branch.clone())).copied().unwrap_or(0.0),
            })
            .max_by(|a, b| a.deviation().total_cmp(&b.deviation()))
    }

    /// Allowed drift for `samples` draws: five standard deviations of a
    /// Bernoulli frequency at p = 0.5.
    pub fn tolerance(samples: usize) -> f64 {
        2.5 / (samples.max(1) as f64).sqrt()
    }
}

fn branch_mass(realizations: &TreeRealizations) -> BTreeMap<BranchKey, f64> {
    let mut mass = BTreeMap::new();
    for rlz in realizations {
        for step in rlz.path.steps() {
            *mass
                .entry((step.branch_set_id.clone(), step.branch_id.clone()))
                .or_insert(0.0) += rlz.weight;
        }
    }
    mass
}
