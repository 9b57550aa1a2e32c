//! Search provider trait and result type

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single web search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title
    pub title: String,

    /// Page URL
    pub url: String,

    /// Snippet or summary text
    pub snippet: String,

    /// Provider that returned the hit
    pub provider: String,
}

/// Trait for web search providers
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a search query
    ///
    /// # Arguments
    ///
    /// * `query` - The search query string
    /// * `max_results` - Upper bound on returned hits
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;

    /// Get the provider name (e.g., "serper", "jina", "exa")
    fn name(&self) -> &str;
}
