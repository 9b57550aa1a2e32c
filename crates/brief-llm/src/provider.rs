//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to different LLM services
/// (OpenRouter, Gemini, OpenAI). Each implementation is responsible for its
/// own key rotation: a `complete` call may try several API keys internally
/// before giving up with [`crate::LlmError::KeysExhausted`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the generated text and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "openrouter", "gemini")
    fn name(&self) -> &str;

    /// Number of API keys available to this provider
    fn key_count(&self) -> usize;
}
