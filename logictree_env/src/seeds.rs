//! Deterministic seed derivation for logic-tree sampling.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Axis index of the source-model logic tree.
pub const SOURCE_MODEL_AXIS: u64 = 0;

/// Axis index of the GSIM logic tree.
pub const GSIM_AXIS: u64 = 1;

/// Derives reproducible seeds and random streams from one master seed.
///
/// Every consumer of randomness gets its own stream:
/// - Deterministic: same master seed always produces the same streams
/// - Unique: each axis and each sample index gets a different stream
/// - Isolated: drawing more samples doesn't change earlier samples
///
/// No stream is ever shared between tasks, so workers may draw in any
/// order without affecting the values they see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeterministicSeeds {
    /// Master seed
    master_seed: u64,
}

impl DeterministicSeeds {
    /// Creates a seed source from the given master seed.
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }
    
    /// Derives the seed of one logic-tree axis.
    ///
    /// The seed is derived deterministically from:
    /// `master_seed * golden_ratio + axis * prime`
    pub fn axis_seed(&self, axis: u64) -> u64 {
        self.master_seed
            .wrapping_mul(0x9e3779b97f4a7c15)  // Golden ratio prime
            .wrapping_add(axis.wrapping_mul(0x517cc1b727220a95))
    }
    
    /// Returns the random stream owned by sample `index`.
    ///
    /// All samples share the ChaCha key derived from the master seed and
    /// differ by stream number, so streams never overlap.
    pub fn sample_rng(&self, index: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.master_seed);
        rng.set_stream(index);
        rng
    }
}
