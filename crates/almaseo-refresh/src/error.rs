//! Error types for status refreshes.

use std::time::Duration;

/// Refresh errors.
///
/// The guard treats every variant the same way: the attempt is over, the
/// last accepted snapshot stays on screen, and the message is surfaced only
/// if the failing request was still current.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// Entity (post) unknown to the backend.
    #[error("post not found: {entity_id}")]
    NotFound { entity_id: u64 },

    /// Credentials or nonce rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Transport failure.
    #[error("network error: {message}")]
    Network { message: String },

    /// Request exceeded the configured timeout.
    #[error("request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// Backend-reported logical failure (e.g. malformed post id).
    #[error("{message}")]
    Backend { message: String },

    /// Response body could not be understood.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl RefreshError {
    /// Shorthand for a backend logical failure.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            Self::Unauthorized { .. } => 2,
            Self::NotFound { .. } => 3,

            // Network/transient
            Self::RateLimited { .. } | Self::Network { .. } | Self::Timeout { .. } => 5,

            Self::Backend { .. } | Self::InvalidResponse { .. } => 6,
        }
    }

    /// Whether re-triggering the refresh later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network { .. } | Self::Timeout { .. }
        )
    }
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for refresh operations.
pub type RefreshResult<T> = Result<T, RefreshError>;
