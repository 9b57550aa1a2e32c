//! Exa search provider
//!
//! Neural search API, the last hop in the fallback chain.
//! See: https://docs.exa.ai/reference/search

use crate::{Result, SearchError, SearchProvider, SearchResult};
use async_trait::async_trait;
use brief_utils::env_nonempty;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const EXA_API_URL: &str = "https://api.exa.ai/search";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const ENV_KEY: &str = "EXA_API_KEY";

/// Exa search provider
pub struct ExaProvider {
    client: Client,
    api_key: String,
    api_url: String,
}

impl ExaProvider {
    /// Create a provider with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: EXA_API_URL.to_string(),
        })
    }

    /// Create a provider from the `EXA_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key =
            env_nonempty(ENV_KEY).ok_or_else(|| SearchError::MissingApiKey("exa".to_string()))?;
        Self::new(api_key)
    }

    /// Override the API endpoint (for tests and proxies)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for ExaProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        debug!(query, "Searching via Exa");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({
                "query": query,
                "numResults": max_results,
                "contents": { "text": true }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let exa_response: ExaResponse = response.json().await.map_err(|e| {
            SearchError::UnexpectedResponse(format!("Failed to parse Exa response: {e}"))
        })?;

        Ok(convert_results(exa_response, max_results))
    }

    fn name(&self) -> &str {
        "exa"
    }
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaHit>,
}

#[derive(Debug, Deserialize)]
struct ExaHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    text: String,
}

fn convert_results(response: ExaResponse, max_results: usize) -> Vec<SearchResult> {
    response
        .results
        .into_iter()
        .take(max_results)
        .map(|hit| SearchResult {
            title: hit.title,
            url: hit.url,
            snippet: hit.text.chars().take(300).collect(),
            provider: "exa".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_results_truncates_text() {
        let response = ExaResponse {
            results: vec![ExaHit {
                title: "Title".to_string(),
                url: "https://example.com".to_string(),
                text: "y".repeat(1000),
            }],
        };

        let results = convert_results(response, 5);
        assert_eq!(results[0].snippet.len(), 300);
        assert_eq!(results[0].provider, "exa");
    }
}
