//! Environment traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Reward;

/// Result of a single exchange with the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Raw state representation, decoded by a [`crate::StateCodec`]
    pub state: String,
    /// Reward signal
    pub reward: Reward,
    /// Terminal flag, when the environment reports one
    pub done: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

impl Step {
    /// Create a step without a terminal flag or extra info
    pub fn new(state: impl Into<String>, reward: impl Into<Reward>) -> Self {
        Self {
            state: state.into(),
            reward: reward.into(),
            done: false,
            info: StepInfo::default(),
        }
    }

    /// Mark the step as terminal
    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.done = true;
        self
    }
}

/// Additional information from a step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInfo {
    /// Custom fields
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// How an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOutcome {
    /// The terminal rule fired
    Terminal,
    /// The per-episode step cap was reached first
    StepBudgetExhausted,
}

/// Episode information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Zero-based ordinal within the run
    pub index: usize,
    /// Total reward, initial observation included
    pub total_reward: f64,
    /// Number of actions taken after the initial observation
    pub steps: usize,
    /// How the episode ended
    pub outcome: EpisodeOutcome,
    /// Exploration rate used for the episode
    pub epsilon: f64,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: chrono::DateTime<chrono::Utc>,
}

impl Episode {
    /// Start a record for episode `index`; finished by [`Episode::finish`]
    #[must_use]
    pub fn begin(index: usize, epsilon: f64) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            index,
            total_reward: 0.0,
            steps: 0,
            outcome: EpisodeOutcome::StepBudgetExhausted,
            epsilon,
            start_time: now,
            end_time: now,
        }
    }

    /// Stamp the end time and outcome
    pub fn finish(&mut self, outcome: EpisodeOutcome) {
        self.outcome = outcome;
        self.end_time = chrono::Utc::now();
    }

    /// Whether the episode reached a terminal state
    #[must_use]
    pub fn reached_terminal(&self) -> bool {
        self.outcome == EpisodeOutcome::Terminal
    }
}

/// Core environment trait
///
/// Every call is a blocking request/response exchange from the caller's
/// point of view: the next call is only made once the previous one
/// resolved.
#[async_trait]
pub trait Environment: Send {
    /// Obtain a first observation through a dedicated reset operation
    async fn reset(&mut self) -> crate::Result<Step> {
        Err(crate::RLError::Environment(
            "environment does not support reset".to_string(),
        ))
    }

    /// Send an action label and receive the resulting observation
    async fn step(&mut self, action: &str) -> crate::Result<Step>;

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}
