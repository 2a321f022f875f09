//! Randomized choice of which items a test case moves
//!
//! Every policy is seeded, including the entropy-backed default, so the
//! seed can be logged and a failing draw replayed with `--seed`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    rng: StdRng,
    seed: u64,
}

impl SelectionPolicy {
    /// Deterministic policy for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Policy with a fresh random seed
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn from_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Pick one index uniformly from `[0, count - 1]`
    pub fn pick_one(&mut self, column: &str, count: usize) -> E2eResult<usize> {
        if count == 0 {
            return Err(E2eError::EmptyColumn(column.to_string()));
        }
        Ok(self.rng.gen_range(0..count))
    }

    /// Pick between 1 and `count` distinct indices, ascending
    ///
    /// The size is drawn from `0..=count` and floored to one, then the
    /// indices themselves are sampled uniformly without replacement.
    pub fn pick_indices(&mut self, column: &str, count: usize) -> E2eResult<Vec<usize>> {
        if count == 0 {
            return Err(E2eError::EmptyColumn(column.to_string()));
        }
        let amount = self.rng.gen_range(0..=count).max(1);
        let mut indices = rand::seq::index::sample(&mut self.rng, count, amount).into_vec();
        indices.sort_unstable();
        Ok(indices)
    }
}
