//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG with 64-bit state. Seeds are passed through a
//! splitmix64 finaliser first: per-trial seeds differ only in their low bits
//! (`base_seed ^ trial_index`) and raw xorshift streams started from nearby
//! states stay correlated for many draws.

use super::DrawSource;
use serde::{Deserialize, Serialize};

/// Seed for trial `trial_index` of a run seeded with `base_seed`
///
/// # Example
/// ```
/// use gig_simulator_core_rs::rng::trial_seed;
///
/// assert_eq!(trial_seed(42, 0), 42);
/// assert_eq!(trial_seed(42, 1), 43);
/// ```
pub fn trial_seed(base_seed: u64, trial_index: usize) -> u64 {
    base_seed ^ trial_index as u64
}

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use gig_simulator_core_rs::rng::{DrawSource, RngManager};
///
/// let mut rng = RngManager::new(12345);
/// let p = rng.next_f64();
/// assert!((0.0..1.0).contains(&p));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG from a seed
    pub fn new(seed: u64) -> Self {
        Self::from_state(splitmix64(seed))
    }

    /// Restore an RNG from a previously captured [`RngManager::state`]
    pub fn from_state(state: u64) -> Self {
        // xorshift must never hold an all-zero state
        let state = if state == 0 { 1 } else { state };
        Self { state }
    }

    /// Current internal state (for replay)
    pub fn state(&self) -> u64 {
        self.state
    }
}

impl DrawSource for RngManager {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_state_converted_to_nonzero() {
        let rng = RngManager::from_state(0);
        assert_ne!(rng.state(), 0);
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range(100, 50);
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);
        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!(
                (0.0..1.0).contains(&val),
                "next_f64() produced value {} outside [0.0, 1.0)",
                val
            );
        }
    }

    #[test]
    fn test_adjacent_trial_seeds_diverge() {
        let mut a = RngManager::new(trial_seed(42, 0));
        let mut b = RngManager::new(trial_seed(42, 1));
        let same = (0..32).filter(|_| a.next_u64() == b.next_u64()).count();
        assert_eq!(same, 0);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = RngManager::new(1);
        for _ in 0..100 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
        }
    }
}
