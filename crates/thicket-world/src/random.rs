//! Deterministic random source shared by clock events and behaviors.
//!
//! All gameplay randomness goes through [`RandomSource`] so a world seeded
//! with the same value replays identically. Tests substitute scripted
//! implementations to force gates open or closed.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;

/// Bounded integer draws and masked boolean tests.
pub trait RandomSource {
    /// A raw 32-bit draw.
    fn next_u32(&mut self) -> u32;

    /// A draw in `0..max_exclusive`.
    ///
    /// # Panics
    ///
    /// Panics if `max_exclusive` is zero.
    fn next(&mut self, max_exclusive: u32) -> u32 {
        assert!(max_exclusive > 0, "random bound must be positive");
        self.next_u32() % max_exclusive
    }

    /// True iff a fresh draw ANDed with `mask` is zero.
    ///
    /// With a mask of `2^n - 1` this succeeds with probability `1 / 2^n`.
    fn test(&mut self, mask: u32) -> bool {
        self.next_u32() & mask == 0
    }
}

/// [`RandomSource`] backed by a PCG32 generator.
#[derive(Debug, Clone)]
pub struct PcgRandom {
    rng: Pcg32,
}

impl PcgRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl RandomSource for PcgRandom {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next(&mut self, max_exclusive: u32) -> u32 {
        assert!(max_exclusive > 0, "random bound must be positive");
        self.rng.gen_range(0..max_exclusive)
    }
}
