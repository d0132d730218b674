//! Deterministic RNG hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each
//! `(stream, key, iteration)` tuple. Sub-seeds are derived via BLAKE3 hashing,
//! independently of the order in which they are requested, so results are
//! identical regardless of event interleaving or thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic RNG hierarchy.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific `(stream, key, iteration)`.
    ///
    /// `stream` names the consumer (e.g. `"jitter"`), `key` is usually an
    /// instrument id.
    pub fn sub_seed(&self, stream: &str, key: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&[0u8]);
        hasher.update(key.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut first = [0u8; 8];
        first.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(first)
    }

    /// Create a seeded StdRng from a sub-seed.
    pub fn rng_for(&self, stream: &str, key: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, key, iteration))
    }
}
