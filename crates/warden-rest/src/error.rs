//! REST client error types

/// REST client error type
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Failed to reach the server at all (DNS, connect, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Token rejected by the platform
    #[error("Authentication failed: status {0}")]
    AuthFailed(u16),

    /// Non-success status from the server
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl RestError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => matches!(status, 502 | 503 | 504),
            Self::AuthFailed(_) | Self::Malformed(_) => false,
        }
    }
}

/// REST client result type
pub type RestResult<T> = Result<T, RestError>;
