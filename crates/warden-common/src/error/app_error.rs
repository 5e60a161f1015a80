//! Application error types
//!
//! Unified error handling for the process boundary. The individual crates
//! keep their own error enums; this type is what `run()` and other top-level
//! plumbing report.

use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Remote platform REST errors
    #[error("External service error: {0}")]
    ExternalService(String),

    // Gateway connection errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl WardenError {
    /// Create a database error from any displayable source
    #[must_use]
    pub fn database(err: impl fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    /// Create an external service error from any displayable source
    #[must_use]
    pub fn external(err: impl fmt::Display) -> Self {
        Self::ExternalService(err.to_string())
    }

    /// Create a gateway error from any displayable source
    #[must_use]
    pub fn gateway(err: impl fmt::Display) -> Self {
        Self::Gateway(err.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// Whether the error is recoverable by retrying later.
    ///
    /// Connectivity-shaped failures are; bad configuration is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::ExternalService(_) | Self::Gateway(_)
        )
    }
}

/// Result type alias for application operations
pub type WardenResult<T> = Result<T, WardenError>;
