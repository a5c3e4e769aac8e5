//! Random roll source
//!
//! Every random decision in the simulation goes through [`Dice`] so runs are
//! reproducible from a seed and tests can script exact outcomes.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

pub trait Dice {
    /// True with probability `p`
    fn chance(&mut self, p: f32) -> bool;
    /// Uniform integer from the closed range `[lo, hi]`
    fn int_between(&mut self, lo: i32, hi: i32) -> i32;
    /// Uniform float from the closed range `[lo, hi]`
    fn float_between(&mut self, lo: f32, hi: f32) -> f32;
}

impl Dice for Pcg32 {
    fn chance(&mut self, p: f32) -> bool {
        self.random_bool(p.clamp(0.0, 1.0) as f64)
    }

    fn int_between(&mut self, lo: i32, hi: i32) -> i32 {
        if lo >= hi {
            return lo;
        }
        self.random_range(lo..=hi)
    }

    fn float_between(&mut self, lo: f32, hi: f32) -> f32 {
        if lo >= hi {
            return lo;
        }
        self.random_range(lo..=hi)
    }
}

/// Seeded generator used by sessions
pub fn seeded(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Dice with scripted answers, for tests that need exact outcomes
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedDice {
    pub chances: std::collections::VecDeque<bool>,
    pub ints: std::collections::VecDeque<i32>,
    /// Answer once `chances` runs out
    pub fallback_chance: bool,
    /// Answer once `ints` runs out
    pub fallback_int: i32,
}

#[cfg(test)]
impl ScriptedDice {
    /// Always answers `chance` and `int`
    pub fn fixed(chance: bool, int: i32) -> Self {
        Self {
            fallback_chance: chance,
            fallback_int: int,
            ..Default::default()
        }
    }

    pub fn with_chances(mut self, chances: &[bool]) -> Self {
        self.chances.extend(chances.iter().copied());
        self
    }

    pub fn with_ints(mut self, ints: &[i32]) -> Self {
        self.ints.extend(ints.iter().copied());
        self
    }
}

#[cfg(test)]
impl Dice for ScriptedDice {
    fn chance(&mut self, _p: f32) -> bool {
        self.chances.pop_front().unwrap_or(self.fallback_chance)
    }

    fn int_between(&mut self, lo: i32, hi: i32) -> i32 {
        self.ints.pop_front().unwrap_or(self.fallback_int).clamp(lo, hi)
    }

    fn float_between(&mut self, lo: f32, hi: f32) -> f32 {
        (self.ints.pop_front().unwrap_or(self.fallback_int) as f32).clamp(lo, hi)
    }
}
