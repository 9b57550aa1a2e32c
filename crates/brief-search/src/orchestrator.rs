//! Search orchestration with provider fallback
//!
//! Tries providers in order and returns the first non-empty result set.
//! Search is best-effort: when every provider fails or returns nothing,
//! the orchestrator yields an empty list rather than an error so callers
//! can proceed without search context.

use crate::{ExaProvider, JinaProvider, SearchProvider, SearchResult, SerperProvider};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Runs queries against an ordered chain of search providers
pub struct SearchOrchestrator {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl SearchOrchestrator {
    /// Create an orchestrator with an explicit provider chain
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    /// Build the default chain from environment variables
    ///
    /// Providers without a configured API key are skipped. The chain
    /// order is Serper, then Jina, then Exa.
    pub fn from_env() -> Self {
        let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();

        match SerperProvider::from_env() {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(e) => debug!("Serper unavailable: {e}"),
        }
        match JinaProvider::from_env() {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(e) => debug!("Jina unavailable: {e}"),
        }
        match ExaProvider::from_env() {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(e) => debug!("Exa unavailable: {e}"),
        }

        if providers.is_empty() {
            warn!("No search providers configured, searches will return no results");
        } else {
            info!(count = providers.len(), "Search providers configured");
        }

        Self { providers }
    }

    /// Number of configured providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Names of configured providers, in chain order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Run a query through the provider chain
    ///
    /// Returns the first non-empty result set. Provider failures are
    /// logged and the next provider is tried. Returns an empty vec when
    /// every provider fails or returns nothing.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        for provider in &self.providers {
            match provider.search(query, max_results).await {
                Ok(results) if !results.is_empty() => {
                    debug!(
                        provider = provider.name(),
                        count = results.len(),
                        "Search succeeded"
                    );
                    return results;
                }
                Ok(_) => {
                    debug!(provider = provider.name(), "Search returned no results");
                }
                Err(e) => {
                    warn!(provider = provider.name(), "Search failed: {e}");
                }
            }
        }

        debug!("All search providers exhausted without results");
        Vec::new()
    }
}
