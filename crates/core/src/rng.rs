//! RNG module - dice sources
//!
//! The engine never calls a random generator directly; it draws rolls from a
//! [`DiceSource`]. Production uses [`SeededDice`] (a `StdRng`, optionally
//! seeded for reproducible matches), tests use [`ScriptedDice`].

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{DiceRoll, DIE_FACES};

/// Something that rolls two six-sided dice
pub trait DiceSource: Send + std::fmt::Debug {
    fn roll(&mut self) -> DiceRoll;
}

/// Uniform dice backed by `StdRng`
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: StdRng,
}

impl SeededDice {
    /// Deterministic dice: the same seed yields the same rolls
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Dice seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    fn die(&mut self) -> u8 {
        self.rng.gen_range(1..=DIE_FACES)
    }
}

impl DiceSource for SeededDice {
    fn roll(&mut self) -> DiceRoll {
        let d1 = self.die();
        let d2 = self.die();
        DiceRoll::new(d1, d2)
    }
}

/// Replays a fixed list of rolls, cycling when exhausted
///
/// An empty script always rolls `(1, 2)`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    script: VecDeque<DiceRoll>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            script: rolls
                .into_iter()
                .map(|(d1, d2)| DiceRoll::new(d1, d2))
                .collect(),
        }
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self) -> DiceRoll {
        match self.script.pop_front() {
            Some(roll) => {
                self.script.push_back(roll);
                roll
            }
            None => DiceRoll::new(1, 2),
        }
    }
}
