//! Per-iteration seed derivation for parallel resampling.
//!
//! A master seed expands into one sub-seed per `(stream, iteration)` pair via
//! BLAKE3. Derivation depends only on its inputs, never on the order in which
//! iterations are scheduled, so a parallel bootstrap draws the same indices
//! for iteration `i` regardless of thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic sub-seed hierarchy rooted at a master seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for one iteration of a named stream.
    ///
    /// Distinct streams (e.g. `"sharpe_improvement"` vs `"symbol_bootstrap"`)
    /// sharing a master seed get unrelated sub-seeds.
    pub fn sub_seed(&self, stream: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, stream: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, iteration))
    }
}
