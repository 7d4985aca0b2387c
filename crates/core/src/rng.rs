//! RNG module - deterministic tile spawning
//!
//! A small LCG drives every random decision of the engine: which empty cell
//! receives the next tile, and whether that tile is a 2 or a 4. Using a
//! seeded generator keeps games reproducible (same seed, same moves, same
//! board), which the AI adapter and the tests rely on.

use crate::types::{SPAWN_ROLL_RANGE, SPAWN_TWO_BELOW};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    ///
    /// Scales by the high bits: the low bits of a power-of-two LCG cycle with
    /// short periods (bit 0 simply alternates).
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        ((self.next_u32() as u64 * max as u64) >> 32) as u32
    }

    /// Pick a uniformly random element of `items`.
    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        let i = self.next_range(items.len() as u32) as usize;
        Some(items[i])
    }

    /// Roll the value of a freshly spawned tile: 2 with probability 0.9, else 4.
    pub fn spawn_value(&mut self) -> u32 {
        if self.next_range(SPAWN_ROLL_RANGE) < SPAWN_TWO_BELOW {
            2
        } else {
            4
        }
    }
}

impl Default for SimpleRng {
    fn default() -> Self {
        Self::new(1)
    }
}
