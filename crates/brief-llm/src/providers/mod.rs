//! Concrete LLM provider implementations

pub mod gemini;
pub mod openai;
pub mod openrouter;

pub use gemini::{GeminiConfig, GeminiProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use openrouter::{OpenRouterConfig, OpenRouterProvider};

use crate::LlmError;

/// Map an HTTP error status to an [`LlmError`].
///
/// Only the quota class (429) gets special treatment downstream; the rest
/// is kept for error reporting.
pub(crate) fn classify_status(status: u16, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited(body),
        400 => LlmError::InvalidRequest(body),
        _ => LlmError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}
