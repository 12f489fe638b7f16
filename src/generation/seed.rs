//! Seed state: one master PRNG per run, child PRNGs per stage.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use sha3::{Digest, Sha3_256};
use std::time::{SystemTime, UNIX_EPOCH};

/// PRNG used throughout generation.
pub type StageRng = Xoshiro256PlusPlus;

#[derive(Debug, Clone)]
pub struct SeedState {
    seed: String,
    hash: u64,
    master: StageRng,
}

impl SeedState {
    /// Derive the master PRNG from `seed`. An empty seed is replaced by the
    /// current time in nanoseconds.
    pub fn new(seed: &str) -> Self {
        let seed = resolve_seed(seed);
        let hash = seed_hash(&seed);
        Self {
            seed,
            hash,
            master: StageRng::seed_from_u64(hash),
        }
    }

    /// Seed string actually used (time-derived seeds are materialized here).
    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Fresh local PRNG seeded from the master stream.
    pub fn fork(&mut self) -> StageRng {
        StageRng::seed_from_u64(self.master.gen())
    }
}

/// `seed` itself, or a seed derived from the current time when it is empty.
pub fn resolve_seed(seed: &str) -> String {
    if seed.is_empty() {
        time_seed()
    } else {
        seed.to_string()
    }
}

/// Deterministic 64-bit hash of a seed string.
pub fn seed_hash(seed: &str) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(seed.as_bytes());
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[0..8]);
    u64::from_le_bytes(bytes)
}

fn time_seed() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    nanos.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_streams() {
        let mut a = SeedState::new("abc");
        let mut b = SeedState::new("abc");
        assert_eq!(a.hash(), b.hash());
        let xa: Vec<u32> = (0..8).map(|_| a.fork().gen()).collect();
        let xb: Vec<u32> = (0..8).map(|_| b.fork().gen()).collect();
        assert_eq!(xa, xb);
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(seed_hash("abc"), seed_hash("abd"));
    }

    #[test]
    fn test_forks_are_independent() {
        let mut state = SeedState::new("forks");
        let mut first = state.fork();
        let mut second = state.fork();
        assert_ne!(first.gen::<u64>(), second.gen::<u64>());
    }

    #[test]
    fn test_empty_seed_is_materialized() {
        let state = SeedState::new("");
        assert!(!state.seed().is_empty());
        assert_eq!(state.hash(), seed_hash(state.seed()));
    }
}
