//! Error types for the Q-learning client

use thiserror::Error;

/// Core error type for RL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment unreachable, or the connection dropped mid-run
    #[error("Connection error: {0}")]
    Connection(String),

    /// Environment payload could not be framed or deserialized
    #[error("Malformed response ({reason}): {payload:?}")]
    MalformedResponse {
        /// Raw payload text, lossily decoded
        payload: String,
        /// What went wrong
        reason: String,
    },

    /// Persisted table is corrupt or has the wrong shape
    #[error("Malformed table at line {line}: {reason}")]
    MalformedTable {
        /// 1-based line number, 0 when the problem is the table as a whole
        line: usize,
        /// What went wrong
        reason: String,
    },

    /// State outside the configured state space
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Action index outside the catalog
    #[error("Invalid action index {index} (catalog has {len} actions)")]
    InvalidAction {
        /// Offending index
        index: usize,
        /// Catalog size
        len: usize,
    },

    /// Action label not present in the catalog
    #[error("Unknown action: {0:?}")]
    UnknownAction(String),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Non-finite value offered to the Q-table
    #[error("Non-finite value {value} for state {state}, action {action}")]
    NonFiniteValue {
        /// Row
        state: usize,
        /// Column
        action: usize,
        /// Rejected value
        value: f64,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RLError {
    /// Build a [`RLError::MalformedResponse`] from raw bytes
    pub fn malformed_response(payload: &[u8], reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            payload: String::from_utf8_lossy(payload).into_owned(),
            reason: reason.into(),
        }
    }

    /// Build a [`RLError::MalformedTable`]
    pub fn malformed_table(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;
