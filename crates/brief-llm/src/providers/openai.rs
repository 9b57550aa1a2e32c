//! OpenAI provider implementation
//!
//! Standard chat-completions client with the same multi-key rotation as
//! the other providers (`OPENAI_API_KEY`, `OPENAI_API_KEY_1`..`_3`).
//! See: https://platform.openai.com/docs/api-reference/chat

use crate::{CompletionRequest, CompletionResponse, KeyRing, LlmProvider, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::classify_status;
use super::openrouter::{ChatRequest, build_chat_messages, parse_chat_response};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const ENV_KEY: &str = "OPENAI_API_KEY";
const MAX_NUMBERED_KEYS: usize = 3;

/// Configuration for the OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL for the API (default: "https://api.openai.com/v1")
    ///
    /// Can be customized for OpenAI-compatible endpoints.
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OpenAiConfig {
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
}

/// OpenAI provider with multi-key rotation
pub struct OpenAiProvider {
    client: Client,
    keys: KeyRing,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a provider with an explicit key ring and custom configuration
    pub fn with_config(keys: KeyRing, config: OpenAiConfig) -> Result<Self> {
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
        Self::with_config(keys, OpenAiConfig::default())
    }

    /// Create a provider from environment variables
    ///
    /// Reads `OPENAI_API_KEY` and `OPENAI_API_KEY_1` through `_3`.
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
    pub fn config(&self) -> &OpenAiConfig {
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
impl LlmProvider for OpenAiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if self.keys.is_empty() {
            return Err(crate::LlmError::ConfigurationError(
                "no OpenAI API keys configured".to_string(),
            ));
        }

        let attempts = self.keys.len();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let Some(api_key) = self.keys.next_key() else {
                break;
            };

            debug!(attempt, attempts, "Sending request to OpenAI");

            match self.try_complete(&api_key, &request).await {
                Ok(body) => {
                    let response = parse_chat_response(&body, &request.model, "openai")?;
                    debug!(tokens = response.usage.total(), "OpenAI request succeeded");
                    return Ok(response);
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "OpenAI key failed, rotating");
                    last_error = err.to_string();
                }
            }
        }

        Err(crate::LlmError::KeysExhausted {
            provider: "openai".to_string(),
            attempts,
            last_error,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn key_count(&self) -> usize {
        self.keys.len()
    }
}
