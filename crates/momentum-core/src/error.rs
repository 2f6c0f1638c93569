//! Core error types for momentum-core.
//!
//! Only malformed input and I/O surface as errors. Rule violations on a
//! candidate playlist are reported through [`crate::invariants::ValidationOutcome`]
//! and absorbed by the fallback cascade, so they never appear here.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionState;

/// Core error type for momentum-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A required input was not supplied by the caller.
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Illegal session state transition
    #[error(transparent)]
    Transition(#[from] SessionTransitionError),

    /// TOML serialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be prepared
    #[error("Cannot prepare data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid clock time string
    #[error("Invalid clock time '{0}': expected HH:MM")]
    InvalidClockTime(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// A session event that is not legal in the session's current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot {event} a session that is {from}")]
pub struct SessionTransitionError {
    pub from: SessionState,
    pub event: &'static str,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
