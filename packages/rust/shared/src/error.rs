//! Error types for LeadScout.
//!
//! Library crates use [`LeadScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all LeadScout operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadScoutError {
    /// Configuration loading or credential error. Detected before any
    /// external call is attempted.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed search request, rejected before any external call.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The discovery service failed or produced no usable result.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// The enrichment service failed for one record.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Network/HTTP error talking to an external service.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed service response or candidate record.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// An external call exceeded its time bound.
    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    /// Operation not allowed in the current run phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// No record with the given id exists in the current run.
    #[error("lead not found: {0}")]
    LeadNotFound(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadScoutError>;

impl LeadScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error belongs to the pre-run configuration class.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
