//! Run configuration for the episode driver

use std::path::PathBuf;

use qlearn_core::{ActionCatalog, RLError, Result, StateCodec};
use serde::{Deserialize, Serialize};

use crate::schedule::EpsilonSchedule;

/// Where the table comes from and whether it is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Start from a zero table; learn and save
    #[default]
    Fresh,
    /// Load `table_path`; learn and save
    Resume,
    /// Load `table_path`; never update or save
    #[serde(alias = "evaluate-only", alias = "evaluate_only")]
    Evaluate,
}

impl RunMode {
    /// Whether the learner writes to the table
    #[must_use]
    pub fn learns(self) -> bool {
        !matches!(self, Self::Evaluate)
    }

    /// Whether the table is read from disk at startup
    #[must_use]
    pub fn loads_table(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

impl std::str::FromStr for RunMode {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fresh" => Ok(Self::Fresh),
            "resume" => Ok(Self::Resume),
            "evaluate" | "evaluate-only" | "eval" => Ok(Self::Evaluate),
            other => Err(RLError::InvalidConfig(format!(
                "unknown mode {other:?} (expected fresh, resume or evaluate)"
            ))),
        }
    }
}

/// How an episode obtains its first observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum InitialObservation {
    /// Send a fixed action label
    Action {
        /// Label to send
        label: String,
    },
    /// Send a uniformly drawn action
    Random,
    /// Use the environment's dedicated reset operation
    Reset,
}

impl Default for InitialObservation {
    fn default() -> Self {
        Self::Action {
            label: "jump".to_string(),
        }
    }
}

/// When an observation ends the episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalRule {
    /// Honour the environment's `done` flag
    pub use_done_flag: bool,
    /// End the episode once a single reward reaches this value
    pub reward_threshold: Option<f64>,
}

impl Default for TerminalRule {
    fn default() -> Self {
        Self {
            use_done_flag: true,
            reward_threshold: None,
        }
    }
}

impl TerminalRule {
    /// Whether a step with this flag and reward is terminal
    #[must_use]
    pub fn is_terminal(&self, done: bool, reward: qlearn_core::Reward) -> bool {
        (self.use_done_flag && done)
            || self
                .reward_threshold
                .is_some_and(|threshold| reward.reaches(threshold))
    }
}

/// Configuration of one training or evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// High bits of the state string
    pub platform_bits: usize,
    /// Low bits of the state string
    pub direction_bits: usize,
    /// Table rows
    pub num_states: usize,
    /// Action labels, in table column order
    pub actions: ActionCatalog,
    /// Exploration rate (starting value when a schedule decays it)
    pub epsilon: f64,
    /// Per-episode epsilon schedule
    pub epsilon_schedule: EpsilonSchedule,
    /// Learning rate
    pub alpha: f64,
    /// Discount factor
    pub gamma: f64,
    /// Episodes per run
    pub num_episodes: usize,
    /// Actions per episode after the initial observation
    pub max_steps_per_episode: usize,
    /// Persisted table location
    pub table_path: PathBuf,
    /// Fresh, resume or evaluate
    pub mode: RunMode,
    /// First-observation strategy
    pub initial_observation: InitialObservation,
    /// Terminal detection
    pub terminal: TerminalRule,
    /// Save every N episodes in addition to the final save
    pub checkpoint_interval: Option<usize>,
    /// Log an episode line every N episodes
    pub log_interval: usize,
    /// Random seed
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            platform_bits: 7,
            direction_bits: 2,
            num_states: 96,
            actions: ActionCatalog::default(),
            epsilon: 0.1,
            epsilon_schedule: EpsilonSchedule::Constant,
            alpha: 0.1,
            gamma: 0.95,
            num_episodes: 100,
            max_steps_per_episode: 200,
            table_path: PathBuf::from("q_table.txt"),
            mode: RunMode::Fresh,
            initial_observation: InitialObservation::default(),
            terminal: TerminalRule::default(),
            checkpoint_interval: None,
            log_interval: 10,
            seed: None,
        }
    }
}

impl RunConfig {
    /// Codec for the configured state layout
    pub fn codec(&self) -> Result<StateCodec> {
        StateCodec::new(self.platform_bits, self.direction_bits, self.num_states)
    }

    /// Reject inconsistent or out-of-range settings
    pub fn validate(&self) -> Result<()> {
        self.codec()?;

        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(invalid(format!("epsilon {} outside [0, 1]", self.epsilon)));
        }
        self.epsilon_schedule.validate()?;
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(invalid(format!("alpha {} outside (0, 1]", self.alpha)));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(invalid(format!("gamma {} outside [0, 1]", self.gamma)));
        }
        if self.num_episodes == 0 {
            return Err(invalid("num_episodes must be at least 1"));
        }
        if self.checkpoint_interval == Some(0) {
            return Err(invalid("checkpoint_interval must be at least 1"));
        }
        if self.log_interval == 0 {
            return Err(invalid("log_interval must be at least 1"));
        }
        if let Some(threshold) = self.terminal.reward_threshold {
            if !threshold.is_finite() {
                return Err(invalid("terminal reward threshold must be finite"));
            }
        }
        if let InitialObservation::Action { label } = &self.initial_observation {
            self.actions.index(label)?;
        }
        if self.table_path.as_os_str().is_empty() {
            return Err(invalid("table_path is empty"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> RLError {
    RLError::InvalidConfig(message.into())
}
