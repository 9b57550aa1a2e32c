//! The AI manager: hierarchical model fallback over paced providers
//!
//! One manager owns a provider instance per configured backend, the
//! global request pacer and the model hierarchy. Generation walks the
//! hierarchy in priority order; each tier failure (including a fully
//! exhausted key ring) falls through to the next tier.

use crate::config::{EngineConfig, ModelTier, ProviderKind};
use crate::prompts::{self, SearchBlock};
use crate::{EngineError, Result};
use brief_llm::{
    CompletionRequest, GeminiConfig, GeminiProvider, KeyRing, LlmProvider, Message, OpenAiConfig,
    OpenAiProvider, OpenRouterConfig, OpenRouterProvider, RequestPacer,
};
use brief_search::{SearchOrchestrator, extract_search_terms};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A generation request against the model hierarchy
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,

    /// Optional system prompt
    pub system: Option<String>,

    /// Token cap; clamped to the serving tier's limit
    pub max_tokens: Option<usize>,

    /// Sampling temperature; tier default when absent
    pub temperature: Option<f32>,

    /// Restrict the request to one named tier
    pub model_override: Option<String>,
}

impl GenerationRequest {
    /// Create a request with just a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: None,
            temperature: None,
            model_override: None,
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the token cap
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Pin the request to one model from the hierarchy
    pub fn with_model_override(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }
}

/// Result of a successful generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Model response text
    pub content: String,

    /// Model that produced the response
    pub model: String,

    /// Backend name ("openrouter", "gemini", "openai")
    pub provider: String,
}

/// Snapshot of manager capacity, for the `keys` status surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerStatus {
    /// Configured API keys per backend name
    pub key_counts: HashMap<String, usize>,

    /// Current minimum delay between LLM calls, in seconds
    pub request_delay_secs: u64,

    /// Model names in hierarchy order
    pub hierarchy: Vec<String>,

    /// Configured search provider names, in chain order
    pub search_providers: Vec<String>,
}

/// Dispatches generation requests across the model hierarchy
pub struct AiManager {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
    pacer: RequestPacer,
    hierarchy: Vec<ModelTier>,
    orchestrator: SearchOrchestrator,
    max_search_iterations: usize,
    search_results_per_query: usize,
}

impl AiManager {
    /// Create a manager with explicit providers and search chain
    pub fn new(
        providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
        orchestrator: SearchOrchestrator,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            providers,
            pacer: RequestPacer::new(config.request_delay),
            hierarchy: config.hierarchy.clone(),
            orchestrator,
            max_search_iterations: config.max_search_iterations,
            search_results_per_query: config.search_results_per_query,
        })
    }

    /// Build a manager from environment variables
    ///
    /// Backends without configured keys are skipped; they simply never
    /// serve a tier. Search providers come from their own env keys.
    pub fn from_env(config: &EngineConfig) -> Result<Self> {
        let timeout_secs = config.request_timeout.as_secs();
        let mut providers: HashMap<ProviderKind, Arc<dyn LlmProvider>> = HashMap::new();

        let openrouter_keys = KeyRing::from_env("OPENROUTER_API_KEY", 5);
        if openrouter_keys.is_empty() {
            debug!("OpenRouter unavailable: no API keys configured");
        } else {
            providers.insert(
                ProviderKind::OpenRouter,
                Arc::new(OpenRouterProvider::with_config(
                    openrouter_keys,
                    OpenRouterConfig::default().with_timeout(timeout_secs),
                )?),
            );
        }

        let gemini_keys = KeyRing::from_env("GEMINI_API_KEY", 3);
        if gemini_keys.is_empty() {
            debug!("Gemini unavailable: no API keys configured");
        } else {
            providers.insert(
                ProviderKind::Gemini,
                Arc::new(GeminiProvider::with_config(
                    gemini_keys,
                    GeminiConfig::default().with_timeout(timeout_secs),
                )?),
            );
        }

        let openai_keys = KeyRing::from_env("OPENAI_API_KEY", 3);
        if openai_keys.is_empty() {
            debug!("OpenAI unavailable: no API keys configured");
        } else {
            providers.insert(
                ProviderKind::OpenAi,
                Arc::new(OpenAiProvider::with_config(
                    openai_keys,
                    OpenAiConfig::default().with_timeout(timeout_secs),
                )?),
            );
        }

        if providers.is_empty() {
            warn!("No LLM provider keys configured, generation will fail");
        } else {
            info!(count = providers.len(), "LLM providers configured");
        }

        Self::new(providers, SearchOrchestrator::from_env(), config)
    }

    /// Run a request through the hierarchy
    ///
    /// A `model_override` matching a tier pins the request to that tier;
    /// an override naming no known tier falls back to the normal order.
    /// Each tier failure logs and falls through; when every tier has
    /// failed the last error is reported in
    /// [`EngineError::AllModelsFailed`].
    #[instrument(skip(self, request), fields(prompt_chars = request.prompt.len()))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput> {
        let tiers: Vec<&ModelTier> = match &request.model_override {
            Some(model) => match self.hierarchy.iter().find(|t| t.model == *model) {
                Some(tier) => vec![tier],
                // An override naming an unknown model is ignored rather
                // than rejected; the request still gets served.
                None => {
                    warn!(%model, "Requested model not in hierarchy, using normal fallback order");
                    self.hierarchy.iter().collect()
                }
            },
            None => self.hierarchy.iter().collect(),
        };

        let mut last_error = "no LLM providers configured".to_string();
        for tier in tiers {
            let Some(provider) = self.providers.get(&tier.provider) else {
                debug!(
                    model = %tier.model,
                    provider = tier.provider.as_str(),
                    "Skipping tier, backend not configured"
                );
                continue;
            };

            let waited = self.pacer.pace().await;
            if !waited.is_zero() {
                debug!(waited_ms = waited.as_millis() as u64, "Paced before LLM call");
            }

            let tier_limit = tier.max_tokens as usize;
            let max_tokens = request.max_tokens.unwrap_or(tier_limit).min(tier_limit);
            let mut builder = CompletionRequest::builder(&tier.model)
                .add_message(Message::user(&request.prompt))
                .max_tokens(max_tokens)
                .temperature(request.temperature.unwrap_or(tier.temperature));
            if let Some(system) = &request.system {
                builder = builder.system(system);
            }

            match provider.complete(builder.build()).await {
                Ok(response) => {
                    info!(model = %tier.model, provider = tier.provider.as_str(), "Generation succeeded");
                    return Ok(GenerationOutput {
                        content: response.content,
                        model: tier.model.clone(),
                        provider: tier.provider.as_str().to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        model = %tier.model,
                        provider = tier.provider.as_str(),
                        "Tier failed, falling through: {e}"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(EngineError::AllModelsFailed(last_error))
    }

    /// Generate with web search enrichment
    ///
    /// Extracts search terms from the prompt, runs them through the
    /// search chain and injects a `=== SEARCH DATA: <query> ===` block
    /// per non-empty result set before generating. Returns the output
    /// and the number of injected search blocks. Search failure is
    /// never fatal; the prompt simply goes out without search data.
    #[instrument(skip(self, request, context))]
    pub async fn generate_with_search(
        &self,
        request: &GenerationRequest,
        context: Option<&str>,
    ) -> Result<(GenerationOutput, usize)> {
        let terms = extract_search_terms(&request.prompt);
        let mut blocks = Vec::new();
        for term in terms.into_iter().take(self.max_search_iterations) {
            let results = self
                .orchestrator
                .search(&term, self.search_results_per_query)
                .await;
            if !results.is_empty() {
                blocks.push(SearchBlock {
                    query: term,
                    results,
                });
            }
        }
        let searches_used = blocks.len();
        debug!(searches_used, "Search enrichment complete");

        let enriched = prompts::enriched_prompt(&request.prompt, context, &blocks)?;
        let mut enriched_request = request.clone();
        enriched_request.prompt = enriched;

        let output = self.generate(&enriched_request).await?;
        Ok((output, searches_used))
    }

    /// The search chain, shared with the collection step
    pub fn search_chain(&self) -> &SearchOrchestrator {
        &self.orchestrator
    }

    /// Capacity snapshot: key counts, pacing, hierarchy, search chain
    pub fn status(&self) -> ManagerStatus {
        let mut key_counts = HashMap::new();
        for kind in [
            ProviderKind::OpenRouter,
            ProviderKind::Gemini,
            ProviderKind::OpenAi,
        ] {
            let count = self
                .providers
                .get(&kind)
                .map_or(0, |provider| provider.key_count());
            key_counts.insert(kind.as_str().to_string(), count);
        }

        ManagerStatus {
            key_counts,
            request_delay_secs: self.pacer.min_interval().as_secs(),
            hierarchy: self.hierarchy.iter().map(|t| t.model.clone()).collect(),
            search_providers: self.orchestrator.provider_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brief_llm::{CompletionResponse, LlmError, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubLlm {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubLlm {
        fn new(name: &'static str, fail: bool) -> Self {
            Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for StubLlm {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> brief_llm::Result<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::RateLimited("quota exceeded".to_string()));
            }
            Ok(CompletionResponse {
                content: format!("echo: {}", request.messages[0].content),
                model: request.model,
                provider: self.name.to_string(),
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            self.name
        }

        fn key_count(&self) -> usize {
            2
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig::default().with_request_delay(Duration::from_millis(1))
    }

    fn manager_with(
        providers: Vec<(ProviderKind, Arc<StubLlm>)>,
        config: &EngineConfig,
    ) -> AiManager {
        let map = providers
            .into_iter()
            .map(|(kind, stub)| (kind, stub as Arc<dyn LlmProvider>))
            .collect();
        AiManager::new(map, SearchOrchestrator::new(Vec::new()), config).unwrap()
    }

    #[tokio::test]
    async fn test_first_tier_serves_when_healthy() {
        let openrouter = Arc::new(StubLlm::new("openrouter", false));
        let manager = manager_with(
            vec![(ProviderKind::OpenRouter, openrouter.clone())],
            &test_config(),
        );

        let output = manager
            .generate(&GenerationRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(output.model, "x-ai/grok-4-fast:free");
        assert_eq!(output.provider, "openrouter");
        assert!(output.content.contains("hello"));
        // Both OpenRouter tiers share the backend, but only one call is made
        assert_eq!(openrouter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_through_to_next_backend() {
        let openrouter = Arc::new(StubLlm::new("openrouter", true));
        let gemini = Arc::new(StubLlm::new("gemini", false));
        let manager = manager_with(
            vec![
                (ProviderKind::OpenRouter, openrouter.clone()),
                (ProviderKind::Gemini, gemini.clone()),
            ],
            &test_config(),
        );

        let output = manager
            .generate(&GenerationRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(output.model, "gemini-2.0-flash-exp");
        assert_eq!(output.provider, "gemini");
        // Two OpenRouter tiers tried and failed before the Gemini tier
        assert_eq!(openrouter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(gemini.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_tiers_failed() {
        let openrouter = Arc::new(StubLlm::new("openrouter", true));
        let gemini = Arc::new(StubLlm::new("gemini", true));
        let manager = manager_with(
            vec![
                (ProviderKind::OpenRouter, openrouter),
                (ProviderKind::Gemini, gemini),
            ],
            &test_config(),
        );

        let result = manager.generate(&GenerationRequest::new("hello")).await;
        match result {
            Err(EngineError::AllModelsFailed(last)) => assert!(last.contains("quota")),
            other => panic!("expected AllModelsFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_backends_are_skipped() {
        // Only the Gemini backend exists; the OpenRouter tiers are skipped
        let gemini = Arc::new(StubLlm::new("gemini", false));
        let manager = manager_with(vec![(ProviderKind::Gemini, gemini.clone())], &test_config());

        let output = manager
            .generate(&GenerationRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(output.provider, "gemini");
        assert_eq!(gemini.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_override_pins_one_tier() {
        let openrouter = Arc::new(StubLlm::new("openrouter", true));
        let gemini = Arc::new(StubLlm::new("gemini", false));
        let manager = manager_with(
            vec![
                (ProviderKind::OpenRouter, openrouter.clone()),
                (ProviderKind::Gemini, gemini),
            ],
            &test_config(),
        );

        let request = GenerationRequest::new("hello")
            .with_model_override("google/gemini-2.0-flash-exp:free");
        let result = manager.generate(&request).await;

        // The pinned OpenRouter tier fails and nothing else is tried
        assert!(matches!(result, Err(EngineError::AllModelsFailed(_))));
        assert_eq!(openrouter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_model_override_walks_hierarchy() {
        let openrouter = Arc::new(StubLlm::new("openrouter", false));
        let manager = manager_with(
            vec![(ProviderKind::OpenRouter, openrouter.clone())],
            &test_config(),
        );

        let request = GenerationRequest::new("hello").with_model_override("gpt-99");
        let output = manager.generate(&request).await.unwrap();

        // The bogus override is ignored and the first tier serves
        assert_eq!(output.model, "x-ai/grok-4-fast:free");
        assert_eq!(openrouter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_with_search_injects_blocks() {
        use brief_search::{SearchProvider, SearchResult};

        struct StubSearch;

        #[async_trait::async_trait]
        impl SearchProvider for StubSearch {
            async fn search(
                &self,
                query: &str,
                _max_results: usize,
            ) -> brief_search::Result<Vec<SearchResult>> {
                Ok(vec![SearchResult {
                    title: format!("About {query}"),
                    url: "https://example.com".to_string(),
                    snippet: "snippet".to_string(),
                    provider: "stub".to_string(),
                }])
            }

            fn name(&self) -> &str {
                "stub"
            }
        }

        let llm = Arc::new(StubLlm::new("openrouter", false));
        let map: HashMap<ProviderKind, Arc<dyn LlmProvider>> =
            HashMap::from([(ProviderKind::OpenRouter, llm as Arc<dyn LlmProvider>)]);
        let orchestrator = SearchOrchestrator::new(vec![Arc::new(StubSearch)]);
        let manager = AiManager::new(map, orchestrator, &test_config()).unwrap();

        let request = GenerationRequest::new("analyze the specialty coffee market in Portugal");
        let (output, searches_used) = manager
            .generate_with_search(&request, Some("focus on cafes"))
            .await
            .unwrap();

        assert_eq!(searches_used, 1);
        // The echoed prompt carries the injected search block and context
        assert!(output.content.contains("=== SEARCH DATA:"));
        assert!(output.content.contains("focus on cafes"));
    }

    #[tokio::test]
    async fn test_generate_with_search_degrades_without_results() {
        let llm = Arc::new(StubLlm::new("openrouter", false));
        let manager = manager_with(vec![(ProviderKind::OpenRouter, llm)], &test_config());

        let request = GenerationRequest::new("analyze the specialty coffee market in Portugal");
        let (output, searches_used) = manager
            .generate_with_search(&request, None)
            .await
            .unwrap();

        assert_eq!(searches_used, 0);
        assert!(!output.content.contains("SEARCH DATA"));
    }

    #[tokio::test]
    async fn test_status_reports_capacity() {
        let manager = manager_with(
            vec![(ProviderKind::OpenRouter, Arc::new(StubLlm::new("openrouter", false)))],
            &test_config(),
        );

        let status = manager.status();
        assert_eq!(status.key_counts["openrouter"], 2);
        assert_eq!(status.key_counts["gemini"], 0);
        assert_eq!(status.hierarchy.len(), 3);
        assert!(status.search_providers.is_empty());
    }
}
