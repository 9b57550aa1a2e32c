//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur during LLM operations
///
/// The taxonomy the rest of the system cares about is coarse: quota and
/// rate-limit failures ([`LlmError::RateLimited`], [`LlmError::KeysExhausted`])
/// trigger key rotation and tier fallback, everything else is reported as-is.
#[derive(Error, Debug)]
pub enum LlmError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit or quota exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every configured key for a provider failed
    #[error("all {attempts} {provider} API keys failed (last error: {last_error})")]
    KeysExhausted {
        provider: String,
        attempts: usize,
        last_error: String,
    },

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LlmError {
    /// True for quota-class failures that key rotation can work around.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::KeysExhausted { .. })
    }
}
