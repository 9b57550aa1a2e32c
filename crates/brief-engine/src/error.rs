//! Error types for the analysis engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while running an analysis
#[derive(Error, Debug)]
pub enum EngineError {
    /// No model in the hierarchy produced a response
    #[error("all models in the hierarchy failed (last error: {0})")]
    AllModelsFailed(String),

    /// Session directory not found
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session exists but a step's artifact is absent
    #[error("artifact {file} not found for session {session}")]
    ArtifactMissing { session: String, file: String },

    /// Request rejected before any work started
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Engine configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Prompt template rendering failed
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// LLM layer error
    #[error(transparent)]
    Llm(#[from] brief_llm::LlmError),

    /// Search layer error
    #[error(transparent)]
    Search(#[from] brief_search::SearchError),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
