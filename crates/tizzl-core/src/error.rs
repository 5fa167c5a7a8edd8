//! Error types for tizzl

use thiserror::Error;

/// Result type alias using TizzlError
pub type Result<T> = std::result::Result<T, TizzlError>;

/// Error type alias for convenience
pub type Error = TizzlError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const RETRIEVAL_UNAVAILABLE: i32 = 4;
}

/// Main error type for tizzl
#[derive(Debug, Error)]
pub enum TizzlError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider rate limited: {0}")]
    RateLimited(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Retrieval cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TizzlError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidRequest(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::RetrievalUnavailable(_) => exit_codes::RETRIEVAL_UNAVAILABLE,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether a retry of the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::IndexUnavailable(_) | Self::Timeout(_))
    }
}
