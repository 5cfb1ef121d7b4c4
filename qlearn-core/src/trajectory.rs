//! Transitions consumed by the learner

use crate::Reward;

/// Single transition, addressed by table indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Table row of the state the action was taken in
    pub state: usize,
    /// Action index
    pub action: usize,
    /// Reward received
    pub reward: Reward,
    /// Table row of the resulting state
    pub next_state: usize,
    /// Whether the episode ended on this transition
    pub done: bool,
}

impl Transition {
    /// Create a new transition
    #[must_use]
    pub fn new(state: usize, action: usize, reward: impl Into<Reward>, next_state: usize) -> Self {
        Self {
            state,
            action,
            reward: reward.into(),
            next_state,
            done: false,
        }
    }
}
