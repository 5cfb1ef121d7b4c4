//! Environment adapters for the Q-learning client
//!
//! The simulation runs as a separate server process. This crate speaks its
//! wire format over TCP and exposes it through the core
//! [`Environment`](qlearn_core::Environment) trait.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod protocol;
pub mod tcp;

// Re-export environments
pub use protocol::{decode_response, normalize_literal, FrameBuffer, DEFAULT_MAX_FRAME_BYTES};
pub use tcp::{TcpConfig, TcpEnvironment};

// Re-export core types
pub use qlearn_core::{Environment, Reward, Step, StepInfo};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{TcpConfig, TcpEnvironment};
    pub use qlearn_core::prelude::*;
}
