//! Deterministic random number generation
//!
//! Every random draw in the simulator flows through a [`SimRng`]. A run has
//! one master seed and each simulated person gets an independent stream
//! derived from `(seed, person index)`, so a person's timeline, plan choices
//! and claim adjustments are reproducible regardless of which worker thread
//! processed them or in what order.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Seeded random source for one simulated person
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha20Rng,
}

impl SimRng {
    /// Creates a generator from a seed
    pub fn seed_from(seed: u64) -> Self {
        Self {
            inner: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Derives the stream for the person at `index` under `master_seed`
    pub fn for_person(master_seed: u64, index: u64) -> Self {
        Self::seed_from(master_seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    /// Uniform integer in `[0, bound)`. A zero bound yields zero.
    pub fn rand_int(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.inner.gen_range(0..bound)
    }

    /// Uniform float in `[0, 1)`
    pub fn rand(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Fair coin flip
    pub fn rand_bool(&mut self) -> bool {
        self.inner.gen::<bool>()
    }

    /// Bernoulli trial that succeeds with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.rand() < p
    }

    /// Uniform decimal in `[low, high)`
    pub fn rand_decimal(&mut self, low: Decimal, high: Decimal) -> Decimal {
        if high <= low {
            return low;
        }
        let unit = Decimal::from_f64(self.rand()).unwrap_or(Decimal::ZERO);
        low + (high - low) * unit
    }

    /// Picks one element uniformly, `None` for an empty slice
    pub fn choose<'a, T>(&mut self, options: &'a [T]) -> Option<&'a T> {
        match options.len() {
            0 => None,
            1 => options.first(),
            n => options.get(self.rand_int(n as u32) as usize),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }
}
