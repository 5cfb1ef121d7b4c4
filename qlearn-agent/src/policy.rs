//! Epsilon-greedy action selection over a Q-table

use qlearn_core::{RLError, Result};
use rand::Rng;

use crate::q_table::QTable;

/// Epsilon-greedy policy
///
/// Explores with probability `epsilon`, otherwise picks the greedy
/// action of the table. The only state is the exploration rate; the
/// random source is supplied by the caller so runs can be replayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl EpsilonGreedy {
    /// Create a new epsilon-greedy policy; `epsilon` must lie in `[0, 1]`
    pub fn new(epsilon: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(RLError::InvalidConfig(format!(
                "epsilon {epsilon} outside [0, 1]"
            )));
        }
        Ok(Self { epsilon })
    }

    /// Always exploit
    #[must_use]
    pub fn greedy() -> Self {
        Self { epsilon: 0.0 }
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Choose an action index for `state`
    ///
    /// Exactly one uniform draw decides the branch; the exploration
    /// branch then draws the action itself.
    pub fn select<R: Rng + ?Sized>(
        &self,
        table: &QTable,
        state: usize,
        rng: &mut R,
    ) -> Result<usize> {
        if rng.gen::<f64>() < self.epsilon {
            // Explore: random action
            let num_actions = table.num_actions();
            if num_actions == 0 {
                return Err(RLError::InvalidAction { index: 0, len: 0 });
            }
            Ok(rng.gen_range(0..num_actions))
        } else {
            // Exploit
            table.best_action(state)
        }
    }
}
