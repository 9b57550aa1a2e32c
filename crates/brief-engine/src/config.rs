//! Engine configuration and the model hierarchy

use crate::{EngineError, Result};
use brief_utils::env_nonempty;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default directory for per-session analysis artifacts
pub const DEFAULT_DATA_DIR: &str = "analyses_data";

/// Default minimum delay between outbound LLM calls
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 10;

/// Default HTTP timeout for LLM calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default number of search queries run per generation
pub const DEFAULT_MAX_SEARCH_ITERATIONS: usize = 3;

/// Default number of results kept per search query
pub const DEFAULT_SEARCH_RESULTS_PER_QUERY: usize = 3;

/// Which LLM backend serves a model tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenRouter aggregator
    OpenRouter,
    /// Google Generative Language API, called directly
    Gemini,
    /// OpenAI chat completions
    OpenAi,
}

impl ProviderKind {
    /// Stable lowercase name used in status output and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

/// One entry in the model fallback hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTier {
    /// Model identifier as the provider expects it
    pub model: String,

    /// Backend that serves this model
    pub provider: ProviderKind,

    /// Token ceiling for this tier
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl ModelTier {
    /// Create a tier with the default temperature (0.7)
    pub fn new(model: impl Into<String>, provider: ProviderKind, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            provider,
            max_tokens,
            temperature: 0.7,
        }
    }
}

/// Engine configuration
///
/// Covers artifact storage, request pacing and the model hierarchy the
/// [`AiManager`](crate::AiManager) walks on failure.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for session artifacts
    pub data_dir: PathBuf,

    /// Minimum delay between outbound LLM calls
    pub request_delay: Duration,

    /// HTTP timeout for a single LLM call
    pub request_timeout: Duration,

    /// Maximum search queries run per generation
    pub max_search_iterations: usize,

    /// Results kept per search query
    pub search_results_per_query: usize,

    /// Ordered model hierarchy, first entry tried first
    pub hierarchy: Vec<ModelTier>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_delay: Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_search_iterations: DEFAULT_MAX_SEARCH_ITERATIONS,
            search_results_per_query: DEFAULT_SEARCH_RESULTS_PER_QUERY,
            hierarchy: default_hierarchy(),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from defaults plus environment overrides
    ///
    /// Honors `BRIEF_DATA_DIR` and `BRIEF_REQUEST_DELAY_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = env_nonempty("BRIEF_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(delay) = env_nonempty("BRIEF_REQUEST_DELAY_SECS")
            && let Ok(secs) = delay.parse::<u64>()
        {
            config.request_delay = Duration::from_secs(secs);
        }

        config
    }

    /// Set the artifact directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the minimum delay between LLM calls
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Set the HTTP timeout for LLM calls
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replace the model hierarchy
    pub fn with_hierarchy(mut self, hierarchy: Vec<ModelTier>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Set search limits
    pub fn with_search_limits(mut self, iterations: usize, results_per_query: usize) -> Self {
        self.max_search_iterations = iterations;
        self.search_results_per_query = results_per_query;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.hierarchy.is_empty() {
            return Err(EngineError::Config(
                "model hierarchy must not be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(EngineError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The free-tier hierarchy: two OpenRouter-hosted models, then the
/// Generative Language API directly as the last resort.
pub fn default_hierarchy() -> Vec<ModelTier> {
    vec![
        ModelTier::new("x-ai/grok-4-fast:free", ProviderKind::OpenRouter, 4000),
        ModelTier::new(
            "google/gemini-2.0-flash-exp:free",
            ProviderKind::OpenRouter,
            8000,
        ),
        ModelTier::new("gemini-2.0-flash-exp", ProviderKind::Gemini, 4000),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("analyses_data"));
        assert_eq!(config.request_delay, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.max_search_iterations, 3);
        assert_eq!(config.search_results_per_query, 3);
        assert_eq!(config.hierarchy.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_hierarchy_order() {
        let hierarchy = default_hierarchy();
        assert_eq!(hierarchy[0].model, "x-ai/grok-4-fast:free");
        assert_eq!(hierarchy[0].provider, ProviderKind::OpenRouter);
        assert_eq!(hierarchy[1].max_tokens, 8000);
        assert_eq!(hierarchy[2].provider, ProviderKind::Gemini);
    }

    #[test]
    fn test_validate_empty_hierarchy() {
        let config = EngineConfig::default().with_hierarchy(Vec::new());
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = EngineConfig::default().with_request_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_from_env_overrides() {
        unsafe {
            std::env::set_var("BRIEF_DATA_DIR", "/tmp/brief-test-data");
            std::env::set_var("BRIEF_REQUEST_DELAY_SECS", "2");
        }
        let config = EngineConfig::from_env();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/brief-test-data"));
        assert_eq!(config.request_delay, Duration::from_secs(2));
        unsafe {
            std::env::remove_var("BRIEF_DATA_DIR");
            std::env::remove_var("BRIEF_REQUEST_DELAY_SECS");
        }
    }

    #[test]
    fn test_builder_chain() {
        let config = EngineConfig::default()
            .with_data_dir("custom_dir")
            .with_request_delay(Duration::from_secs(1))
            .with_search_limits(5, 10);
        assert_eq!(config.data_dir, PathBuf::from("custom_dir"));
        assert_eq!(config.max_search_iterations, 5);
        assert_eq!(config.search_results_per_query, 10);
    }

    #[test]
    fn test_provider_kind_names() {
        assert_eq!(ProviderKind::OpenRouter.as_str(), "openrouter");
        assert_eq!(ProviderKind::Gemini.as_str(), "gemini");
        assert_eq!(ProviderKind::OpenAi.as_str(), "openai");
    }

    #[test]
    fn test_provider_kind_as_map_key() {
        // The manager indexes its backends by kind
        let mut backends = std::collections::HashMap::new();
        backends.insert(ProviderKind::OpenRouter, 5);
        backends.insert(ProviderKind::Gemini, 3);
        assert_eq!(backends.get(&ProviderKind::OpenRouter), Some(&5));
        assert_eq!(backends.get(&ProviderKind::OpenAi), None);
    }
}
