//! Hamstr error types

/// Hamstr error types
#[derive(Debug, thiserror::Error)]
pub enum HamstrError {
    // Upstream/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("catalog error ({status}): {message}")]
    Api { status: u16, message: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Durable-tier errors. The cache recovers from these per entry; they
    // surface only when a basic store operation fails wholesale.
    #[error("storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("no catalog endpoint configured")]
    NoUpstream,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HamstrError {
    /// Whether this error is recoverable by resampling a fresh candidate ID.
    ///
    /// Transport failures, non-2xx statuses, and malformed payloads are all
    /// transient from the collector's point of view; configuration and
    /// storage failures are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HamstrError::Http(_) | HamstrError::Api { .. } | HamstrError::Json(_)
        )
    }
}

/// Result type alias for Hamstr operations
pub type Result<T> = std::result::Result<T, HamstrError>;
