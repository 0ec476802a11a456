//! Deterministic random number generation for synthetic ledgers.
//!
//! RULE: Nothing in the generator may call any platform RNG.
//! All randomness flows through a `LedgerRng` seeded from the single
//! seed on `SynthConfig`, so the same seed always yields the same ledger.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct LedgerRng {
    inner: Pcg64Mcg,
}

impl LedgerRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [lo, hi).
    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        assert!(hi > lo, "empty range {lo}..{hi}");
        lo + self.next_u64_below((hi - lo) as u64) as i64
    }

    /// Roll a float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Choose `k` distinct indices from `0..n`, ascending.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let k = k.min(n);
        // Partial Fisher–Yates.
        for i in 0..k {
            let j = i + self.next_u64_below((n - i) as u64) as usize;
            pool.swap(i, j);
        }
        let mut chosen = pool[..k].to_vec();
        chosen.sort_unstable();
        chosen
    }
}
