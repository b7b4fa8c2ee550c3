//! Error types shared by Coverpilot crates.

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating `coverpilot.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned by a usage data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("usage data unavailable: {0}")]
    Unavailable(String),

    #[error("malformed usage data: {0}")]
    Malformed(String),
}

/// Errors returned by the commitment-execution API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// A plan was already created with this client token.
    #[error("duplicate client token")]
    DuplicateToken { plan_id: Option<String> },

    /// The request parameters were rejected; retrying cannot help.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("transient error: {0}")]
    Transient(String),

    /// The call timed out and its outcome is unknown.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl ApiError {
    /// Whether a later redelivery of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient(_) | ApiError::Timeout(_))
    }
}
