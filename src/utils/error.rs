//! Error Handling
//!
//! Unified error types for the engine.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (bad mappings, suites, patterns)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source or config parse errors reported by a collaborator
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External process errors
    #[error("Command error: {0}")]
    Command(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
