//! Jina search provider
//!
//! Uses the s.jina.ai reader-search endpoint with JSON output.
//! See: https://jina.ai/reader

use crate::{Result, SearchError, SearchProvider, SearchResult};
use async_trait::async_trait;
use brief_utils::env_nonempty;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const JINA_API_URL: &str = "https://s.jina.ai/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const ENV_KEY: &str = "JINA_API_KEY";

/// Jina search provider
pub struct JinaProvider {
    client: Client,
    api_key: String,
    api_url: String,
}

impl JinaProvider {
    /// Create a provider with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: JINA_API_URL.to_string(),
        })
    }

    /// Create a provider from the `JINA_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key =
            env_nonempty(ENV_KEY).ok_or_else(|| SearchError::MissingApiKey("jina".to_string()))?;
        Self::new(api_key)
    }

    /// Override the API endpoint (for tests and proxies)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for JinaProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        debug!(query, "Searching via Jina");

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("q", query)])
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let jina_response: JinaResponse = response.json().await.map_err(|e| {
            SearchError::UnexpectedResponse(format!("Failed to parse Jina response: {e}"))
        })?;

        Ok(convert_results(jina_response, max_results))
    }

    fn name(&self) -> &str {
        "jina"
    }
}

#[derive(Debug, Deserialize)]
struct JinaResponse {
    #[serde(default)]
    data: Vec<JinaHit>,
}

#[derive(Debug, Deserialize)]
struct JinaHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    content: String,
}

fn convert_results(response: JinaResponse, max_results: usize) -> Vec<SearchResult> {
    response
        .data
        .into_iter()
        .take(max_results)
        .map(|hit| {
            // Jina sometimes returns only the full page text; prefer the
            // short description when present.
            let snippet = if hit.description.is_empty() {
                hit.content.chars().take(300).collect()
            } else {
                hit.description
            };
            SearchResult {
                title: hit.title,
                url: hit.url,
                snippet,
                provider: "jina".to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_results_prefers_description() {
        let response = JinaResponse {
            data: vec![JinaHit {
                title: "Title".to_string(),
                url: "https://example.com".to_string(),
                description: "Short description".to_string(),
                content: "Very long page content".to_string(),
            }],
        };

        let results = convert_results(response, 5);
        assert_eq!(results[0].snippet, "Short description");
    }

    #[test]
    fn test_convert_results_falls_back_to_content() {
        let long_content = "x".repeat(500);
        let response = JinaResponse {
            data: vec![JinaHit {
                title: "Title".to_string(),
                url: "https://example.com".to_string(),
                description: String::new(),
                content: long_content,
            }],
        };

        let results = convert_results(response, 5);
        assert_eq!(results[0].snippet.len(), 300);
    }
}
