//! Exa neural-search client.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::{NeuralSearch, SearchHit, SearchResponse};

const SEARCH_TIMEOUT_SECS: u64 = 30;

/// Client for the Exa semantic-search API.
pub struct ExaClient {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl ExaClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.exa.ai";

    /// Create a client; without an API key every search degrades to a
    /// failure result.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        if api_key.is_none() {
            warn!("exa API key not set - semantic search will be unavailable");
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::provider("exa", format!("http client: {e}")))?;
        Ok(Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_search(&self, path: &str, body: impl Serialize) -> SearchResponse {
        let Some(api_key) = &self.api_key else {
            return SearchResponse::failure("exa API not configured");
        };

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                return SearchResponse::failure(format!(
                    "exa returned status {}",
                    response.status()
                ));
            }
            Err(e) => return SearchResponse::failure(e.to_string()),
        };

        let envelope: ExaEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => return SearchResponse::failure(format!("decode: {e}")),
        };

        SearchResponse {
            success: true,
            results: envelope
                .results
                .into_iter()
                .map(|hit| SearchHit {
                    url: hit.url,
                    title: hit.title.unwrap_or_default(),
                    text: hit.text.unwrap_or_default(),
                    published_date: hit.published_date,
                    score: hit.score,
                })
                .collect(),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: Contents,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_published_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindSimilarRequest<'a> {
    url: &'a str,
    num_results: usize,
    contents: Contents,
}

#[derive(Debug, Serialize)]
struct Contents {
    text: bool,
}

#[derive(Debug, Deserialize)]
struct ExaEnvelope {
    #[serde(default)]
    results: Vec<ExaHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaHit {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

#[async_trait]
impl NeuralSearch for ExaClient {
    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, num_results: usize) -> SearchResponse {
        info!(query, "exa search");
        self.post_search(
            "/search",
            SearchRequest {
                query,
                num_results,
                contents: Contents { text: true },
                start_published_date: None,
            },
        )
        .await
    }

    async fn find_similar(&self, url: &str, num_results: usize) -> SearchResponse {
        info!(url, "exa find-similar");
        self.post_search(
            "/findSimilar",
            FindSimilarRequest {
                url,
                num_results,
                contents: Contents { text: true },
            },
        )
        .await
    }

    async fn company_news(&self, company: &str, num_results: usize, days: u32) -> SearchResponse {
        let query = format!("{company} company news announcements");
        let cutoff = Utc::now() - ChronoDuration::days(days as i64);
        info!(company, days, "exa company news");
        self.post_search(
            "/search",
            SearchRequest {
                query: &query,
                num_results,
                contents: Contents { text: true },
                start_published_date: Some(cutoff.format("%Y-%m-%d").to_string()),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_degrades() {
        let client = ExaClient::new(None).unwrap();
        assert!(!client.available());

        let result = client.search("Acme company overview", 5).await;
        assert!(!result.success);
        assert!(result.results.is_empty());
    }
}
