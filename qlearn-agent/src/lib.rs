//! Tabular Q-learning agent for the qlearn workspace
//!
//! This crate provides:
//! - A persisted Q-table with a plain-text format
//! - Epsilon-greedy action selection and per-episode epsilon schedules
//! - The one-step Q-learning update
//! - The episode driver that runs the whole loop against an environment

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod learner;
pub mod policy;
pub mod q_table;
pub mod runner;
pub mod schedule;

// Re-export agent components
pub use config::{InitialObservation, RunConfig, RunMode, TerminalRule};
pub use learner::QLearner;
pub use policy::EpsilonGreedy;
pub use q_table::QTable;
pub use runner::{EpisodeDriver, RunSummary};

// Re-export utilities
pub use schedule::{
    ConstantSchedule, EpsilonSchedule, ExponentialSchedule, LinearSchedule, Schedule,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        EpisodeDriver, EpsilonGreedy, QLearner, QTable, RunConfig, RunMode, RunSummary,
    };
    pub use qlearn_core::prelude::*;
}
