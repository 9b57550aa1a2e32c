//! Error types for search operations

use thiserror::Error;

/// Result type for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// API key missing for a provider
    #[error("API key not configured for {0}")]
    MissingApiKey(String),

    /// API request failed
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    /// Unexpected response format
    #[error("Unexpected search response: {0}")]
    UnexpectedResponse(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
