//! LLM provider abstraction layer for marketbrief-rs
//!
//! This crate provides provider-agnostic abstractions for interacting with
//! the LLM APIs the report generator depends on. It includes:
//!
//! - Message and completion request/response types
//! - The [`LlmProvider`] trait implemented by each backend
//! - Multi-key rotation ([`KeyRing`]) for working around per-key rate limits
//! - A global request pacer that enforces a minimum delay between calls
//! - Concrete providers for OpenRouter, Gemini (direct) and OpenAI

pub mod completion;
pub mod error;
pub mod keyring;
pub mod messages;
pub mod pacer;
pub mod provider;
pub mod providers;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{LlmError, Result};
pub use keyring::KeyRing;
pub use messages::{Message, Role};
pub use pacer::RequestPacer;
pub use provider::LlmProvider;
pub use providers::{
    GeminiConfig, GeminiProvider, OpenAiConfig, OpenAiProvider, OpenRouterConfig,
    OpenRouterProvider,
};
