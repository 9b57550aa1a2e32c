//! OpenRouter provider implementation
//!
//! OpenRouter fronts many models behind an OpenAI-compatible chat API.
//! See: https://openrouter.ai/docs/api-reference/chat-completion
//!
//! The provider rotates through every configured API key
//! (`OPENROUTER_API_KEY`, `OPENROUTER_API_KEY_1`..`_5`): a quota error on
//! one key is retried on the next, and only when the whole ring fails does
//! the call report [`LlmError::KeysExhausted`] to let the caller drop to
//! the next model tier.

use crate::{
    CompletionRequest, CompletionResponse, KeyRing, LlmProvider, Message, Result, Role, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::classify_status;

const DEFAULT_OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_REFERER: &str = "https://github.com/marketbrief/marketbrief-rs";
const DEFAULT_TITLE: &str = "marketbrief";
const ENV_KEY: &str = "OPENROUTER_API_KEY";
const MAX_NUMBERED_KEYS: usize = 5;

/// Configuration for the OpenRouter provider
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Base URL for the API (default: "https://openrouter.ai/api/v1")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// Value for the `HTTP-Referer` attribution header
    pub referer: String,

    /// Value for the `X-Title` attribution header
    pub title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_OPENROUTER_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl OpenRouterConfig {
    /// Set a custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the attribution headers sent with each request
    pub fn with_attribution(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = referer.into();
        self.title = title.into();
        self
    }
}

/// OpenRouter provider with multi-key rotation
pub struct OpenRouterProvider {
    client: Client,
    keys: KeyRing,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    /// Create a provider with an explicit key ring and custom configuration
    pub fn with_config(keys: KeyRing, config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            keys,
            config,
        })
    }

    /// Create a provider with an explicit key ring and default settings
    pub fn new(keys: KeyRing) -> Result<Self> {
        Self::with_config(keys, OpenRouterConfig::default())
    }

    /// Create a provider from environment variables
    ///
    /// Reads `OPENROUTER_API_KEY` and `OPENROUTER_API_KEY_1` through `_5`.
    pub fn from_env() -> Result<Self> {
        let keys = KeyRing::from_env(ENV_KEY, MAX_NUMBERED_KEYS);
        if keys.is_empty() {
            return Err(crate::LlmError::ConfigurationError(format!(
                "{ENV_KEY} environment variable not set"
            )));
        }
        Self::new(keys)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    async fn try_complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String> {
        let chat_request = ChatRequest {
            model: &request.model,
            messages: build_chat_messages(request.system.as_deref(), &request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&chat_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_text));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if self.keys.is_empty() {
            return Err(crate::LlmError::ConfigurationError(
                "no OpenRouter API keys configured".to_string(),
            ));
        }

        let attempts = self.keys.len();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let Some(api_key) = self.keys.next_key() else {
                break;
            };

            debug!(attempt, attempts, "Sending request to OpenRouter");

            match self.try_complete(&api_key, &request).await {
                Ok(body) => {
                    let response = parse_chat_response(&body, &request.model, "openrouter")?;
                    debug!(
                        tokens = response.usage.total(),
                        "OpenRouter request succeeded"
                    );
                    return Ok(response);
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "OpenRouter key failed, rotating");
                    last_error = err.to_string();
                }
            }
        }

        Err(crate::LlmError::KeysExhausted {
            provider: "openrouter".to_string(),
            attempts,
            last_error,
        })
    }

    fn name(&self) -> &str {
        "openrouter"
    }

    fn key_count(&self) -> usize {
        self.keys.len()
    }
}

// ============================================================================
// Wire types (OpenAI-compatible chat schema)
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub(crate) model: &'a str,
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    pub(crate) stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: &'static str,
    pub(crate) content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

/// Build chat messages in wire order: system first, then the conversation.
pub(crate) fn build_chat_messages(system: Option<&str>, messages: &[Message]) -> Vec<ChatMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = system {
        result.push(ChatMessage {
            role: "system",
            content: system.to_string(),
        });
    }

    for message in messages {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        result.push(ChatMessage {
            role,
            content: message.content.clone(),
        });
    }

    result
}

/// Parse an OpenAI-compatible chat response body into our response type.
pub(crate) fn parse_chat_response(
    body: &str,
    model: &str,
    provider: &str,
) -> Result<CompletionResponse> {
    let chat_response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| crate::LlmError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

    let content = chat_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| crate::LlmError::UnexpectedResponse("No choices in response".to_string()))?;

    let usage = chat_response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content,
        model: model.to_string(),
        provider: provider.to_string(),
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let keys = KeyRing::new(vec!["test-key".to_string()]);
        let provider = OpenRouterProvider::new(keys).unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.key_count(), 1);
        assert_eq!(provider.config().api_base, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_custom_config() {
        let config = OpenRouterConfig::default()
            .with_api_base("https://proxy.example.com/v1")
            .with_timeout(60)
            .with_attribution("https://example.com", "example");

        let keys = KeyRing::new(vec!["k".to_string()]);
        let provider = OpenRouterProvider::with_config(keys, config).unwrap();
        assert_eq!(provider.config().api_base, "https://proxy.example.com/v1");
        assert_eq!(provider.config().timeout_secs, 60);
        assert_eq!(provider.config().title, "example");
    }

    #[tokio::test]
    async fn test_complete_without_keys() {
        let provider = OpenRouterProvider::new(KeyRing::new(Vec::new())).unwrap();
        let request = CompletionRequest::builder("x-ai/grok-4-fast:free")
            .add_message(Message::user("hi"))
            .build();

        let result = provider.complete(request).await;
        assert!(matches!(
            result,
            Err(crate::LlmError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_system_message_ordering() {
        let messages = vec![Message::user("Analyze this market")];
        let wire = build_chat_messages(Some("You are a market analyst"), &messages);

        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[1].content, "Analyze this market");
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Report text"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 80}
        }"#;

        let response = parse_chat_response(body, "x-ai/grok-4-fast:free", "openrouter").unwrap();
        assert_eq!(response.content, "Report text");
        assert_eq!(response.usage.input_tokens, 120);
        assert_eq!(response.usage.output_tokens, 80);
        assert_eq!(response.provider, "openrouter");
    }

    #[test]
    fn test_parse_chat_response_without_usage() {
        let body = r#"{"choices": [{"message": {"content": "ok"}}]}"#;
        let response = parse_chat_response(body, "m", "openrouter").unwrap();
        assert_eq!(response.usage.total(), 0);
    }

    #[test]
    fn test_parse_chat_response_no_choices() {
        let body = r#"{"choices": []}"#;
        let result = parse_chat_response(body, "m", "openrouter");
        assert!(matches!(
            result,
            Err(crate::LlmError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_every_key_tried_before_exhaustion() {
        // Nothing listens on port 1, so each key fails with a transport
        // error and the ring is walked to the end.
        let config = OpenRouterConfig::default()
            .with_api_base("http://127.0.0.1:1/v1")
            .with_timeout(2);
        let keys = KeyRing::new(vec!["k1".to_string(), "k2".to_string(), "k3".to_string()]);
        let provider = OpenRouterProvider::with_config(keys, config).unwrap();

        let request = CompletionRequest::builder("x-ai/grok-4-fast:free")
            .add_message(Message::user("hi"))
            .build();

        match provider.complete(request).await {
            Err(crate::LlmError::KeysExhausted {
                provider, attempts, ..
            }) => {
                assert_eq!(provider, "openrouter");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected KeysExhausted, got {other:?}"),
        }
    }
}
