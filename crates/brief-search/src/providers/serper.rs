//! Serper search provider
//!
//! Serper wraps Google search results behind a JSON API.
//! See: https://serper.dev

use crate::{Result, SearchError, SearchProvider, SearchResult};
use async_trait::async_trait;
use brief_utils::env_nonempty;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SERPER_API_URL: &str = "https://google.serper.dev/search";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const ENV_KEY: &str = "SERPER_API_KEY";

/// Serper (Google) search provider
pub struct SerperProvider {
    client: Client,
    api_key: String,
    api_url: String,
}

impl SerperProvider {
    /// Create a provider with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: SERPER_API_URL.to_string(),
        })
    }

    /// Create a provider from the `SERPER_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = env_nonempty(ENV_KEY)
            .ok_or_else(|| SearchError::MissingApiKey("serper".to_string()))?;
        Self::new(api_key)
    }

    /// Override the API endpoint (for tests and proxies)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for SerperProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        debug!(query, "Searching via Serper");

        let response = self
            .client
            .post(&self.api_url)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query, "num": max_results }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let serper_response: SerperResponse = response.json().await.map_err(|e| {
            SearchError::UnexpectedResponse(format!("Failed to parse Serper response: {e}"))
        })?;

        Ok(convert_results(serper_response, max_results))
    }

    fn name(&self) -> &str {
        "serper"
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

fn convert_results(response: SerperResponse, max_results: usize) -> Vec<SearchResult> {
    response
        .organic
        .into_iter()
        .take(max_results)
        .map(|hit| SearchResult {
            title: hit.title,
            url: hit.link,
            snippet: hit.snippet,
            provider: "serper".to_string(),
        })
        .collect()
}
