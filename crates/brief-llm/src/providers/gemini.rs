//! Gemini direct provider implementation
//!
//! Talks to the Generative Language API without going through OpenRouter.
//! See: https://ai.google.dev/api/generate-content
//!
//! This is the last tier in the default hierarchy: when every OpenRouter
//! key is exhausted, the manager falls back to direct Gemini calls with
//! their own key ring (`GEMINI_API_KEY`, `GEMINI_API_KEY_1`..`_3`).

use crate::{CompletionRequest, CompletionResponse, KeyRing, LlmProvider, Message, Result, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::classify_status;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const ENV_KEY: &str = "GEMINI_API_KEY";
const MAX_NUMBERED_KEYS: usize = 3;

// Sampling defaults carried over from the Gemini SDK configuration the
// generator was tuned with.
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 64;

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL for the API
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GeminiConfig {
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

/// Gemini direct provider with multi-key rotation
pub struct GeminiProvider {
    client: Client,
    keys: KeyRing,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a provider with an explicit key ring and custom configuration
    pub fn with_config(keys: KeyRing, config: GeminiConfig) -> Result<Self> {
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
        Self::with_config(keys, GeminiConfig::default())
    }

    /// Create a provider from environment variables
    ///
    /// Reads `GEMINI_API_KEY` and `GEMINI_API_KEY_1` through `_3`.
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
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn try_complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String> {
        let generate_request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: combine_prompt(request.system.as_deref(), &request.messages),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.api_base, request.model
            ))
            .header("x-goog-api-key", api_key)
            .json(&generate_request)
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
impl LlmProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if self.keys.is_empty() {
            return Err(crate::LlmError::ConfigurationError(
                "no Gemini API keys configured".to_string(),
            ));
        }

        let attempts = self.keys.len();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let Some(api_key) = self.keys.next_key() else {
                break;
            };

            debug!(attempt, attempts, "Sending request to Gemini");

            match self.try_complete(&api_key, &request).await {
                Ok(body) => {
                    let response = parse_generate_response(&body, &request.model)?;
                    debug!(tokens = response.usage.total(), "Gemini request succeeded");
                    return Ok(response);
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "Gemini key failed, rotating");
                    last_error = err.to_string();
                }
            }
        }

        Err(crate::LlmError::KeysExhausted {
            provider: "gemini".to_string(),
            attempts,
            last_error,
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn key_count(&self) -> usize {
        self.keys.len()
    }
}

// ============================================================================
// Wire types (generateContent schema)
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    top_p: f32,
    top_k: u32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: usize,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: usize,
}

/// Collapse a system prompt plus conversation into one text part.
///
/// The generateContent call here carries a single combined prompt; the
/// system text goes first, then each message in order.
pub(crate) fn combine_prompt(system: Option<&str>, messages: &[Message]) -> String {
    let mut parts = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = system {
        parts.push(system.to_string());
    }
    for message in messages {
        parts.push(message.content.clone());
    }

    parts.join("\n\n")
}

fn parse_generate_response(body: &str, model: &str) -> Result<CompletionResponse> {
    let generate_response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| crate::LlmError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

    let content = generate_response
        .candidates
        .into_iter()
        .next()
        .map(|candidate| {
            candidate
                .content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            crate::LlmError::UnexpectedResponse("No candidates in response".to_string())
        })?;

    let usage = generate_response
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content,
        model: model.to_string(),
        provider: "gemini".to_string(),
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let keys = KeyRing::new(vec!["test-key".to_string()]);
        let provider = GeminiProvider::new(keys).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.key_count(), 1);
    }

    #[test]
    fn test_combine_prompt_with_system() {
        let messages = vec![Message::user("What moved the market today?")];
        let combined = combine_prompt(Some("You are a market analyst"), &messages);
        assert_eq!(
            combined,
            "You are a market analyst\n\nWhat moved the market today?"
        );
    }

    #[test]
    fn test_combine_prompt_without_system() {
        let messages = vec![Message::user("Hello")];
        assert_eq!(combine_prompt(None, &messages), "Hello");
    }

    #[test]
    fn test_parse_generate_response() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Part one. "}, {"text": "Part two."}], "role": "model"}
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 20}
        }"#;

        let response = parse_generate_response(body, "gemini-2.0-flash-exp").unwrap();
        assert_eq!(response.content, "Part one. Part two.");
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 20);
        assert_eq!(response.provider, "gemini");
    }

    #[test]
    fn test_parse_generate_response_empty_candidates() {
        let body = r#"{"candidates": []}"#;
        let result = parse_generate_response(body, "gemini-2.0-flash-exp");
        assert!(matches!(
            result,
            Err(crate::LlmError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_without_keys() {
        let provider = GeminiProvider::new(KeyRing::new(Vec::new())).unwrap();
        let request = CompletionRequest::builder("gemini-2.0-flash-exp")
            .add_message(Message::user("hi"))
            .build();

        let result = provider.complete(request).await;
        assert!(matches!(
            result,
            Err(crate::LlmError::ConfigurationError(_))
        ));
    }
}
