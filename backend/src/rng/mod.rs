//! Deterministic random number generation
//!
//! Every random draw in a trial (population attributes, network wiring,
//! policy decisions, audits) comes from a [`DrawSource`]. The engine hands
//! each trial its own [`RngManager`] seeded from `base_seed XOR trial_index`,
//! so trials are independent yet exactly reproducible.
//!
//! CRITICAL: Nothing in the simulator may use an unseeded source of randomness.

mod xorshift;

pub use xorshift::{trial_seed, RngManager};

/// Seeded source of random draws.
///
/// Only [`DrawSource::next_u64`] must be provided; the remaining helpers are
/// derived from it so that every implementation consumes the stream in the
/// same way.
pub trait DrawSource {
    /// Next raw 64-bit value from the stream
    fn next_u64(&mut self) -> u64;

    /// Uniform f64 in `[0.0, 1.0)` built from the top 53 bits
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform integer in `[min, max)`
    ///
    /// # Panics
    /// Panics if `min >= max`
    fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");
        let span = (max - min) as u64;
        min + (self.next_u64() % span) as i64
    }

    /// Uniform index in `[0, len)`
    ///
    /// # Panics
    /// Panics if `len == 0`
    fn index(&mut self, len: usize) -> usize {
        self.range(0, len as i64) as usize
    }

    /// Bernoulli trial with success probability `p`
    ///
    /// Always consumes exactly one draw, even for `p <= 0` or `p >= 1`,
    /// so the stream position never depends on parameter values.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Standard normal deviate (Box-Muller, consumes two draws)
    fn standard_normal(&mut self) -> f64 {
        // 1 - u keeps the logarithm argument in (0, 1]
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}
