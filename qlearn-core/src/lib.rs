//! Core traits and types for the tabular Q-learning client
//!
//! This crate provides the shared vocabulary of the workspace: how raw
//! environment states map onto table rows, the fixed action catalog,
//! transitions, episode records and the environment interface the
//! driver talks to.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod environment;
pub mod error;
pub mod reward;
pub mod state;
pub mod trajectory;

// Re-export core traits and types
pub use action::ActionCatalog;
pub use environment::{Environment, Episode, EpisodeOutcome, Step, StepInfo};
pub use error::{RLError, Result};
pub use reward::Reward;
pub use state::{StateCodec, StateFields};
pub use trajectory::Transition;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActionCatalog, Environment, Result, Reward, StateCodec, Step, Transition,
    };
}
