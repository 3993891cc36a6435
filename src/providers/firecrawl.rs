//! Firecrawl web-scrape client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::{ScrapeResult, WebScraper};

const SCRAPE_TIMEOUT_SECS: u64 = 60;

/// Client for the Firecrawl scraping API.
pub struct FirecrawlClient {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl FirecrawlClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.firecrawl.dev";

    /// Create a client; without an API key it reports unavailable and every
    /// scrape degrades to a failure result.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        if api_key.is_none() {
            warn!("firecrawl API key not set - scraping will be unavailable");
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::provider("firecrawl", format!("http client: {e}")))?;
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
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ScrapeEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    metadata: Value,
}

#[async_trait]
impl WebScraper for FirecrawlClient {
    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn scrape(&self, url: &str, formats: &[&str]) -> ScrapeResult {
        let Some(api_key) = &self.api_key else {
            return ScrapeResult::failure(url, "firecrawl API not configured");
        };

        info!(url, "scraping with firecrawl");
        let formats = if formats.is_empty() {
            vec!["markdown", "html"]
        } else {
            formats.to_vec()
        };

        let response = self
            .http
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(api_key)
            .json(&ScrapeRequest { url, formats })
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                return ScrapeResult::failure(
                    url,
                    format!("firecrawl returned status {}", response.status()),
                );
            }
            Err(e) => return ScrapeResult::failure(url, e.to_string()),
        };

        let envelope: ScrapeEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => return ScrapeResult::failure(url, format!("decode: {e}")),
        };

        if !envelope.success {
            return ScrapeResult::failure(
                url,
                envelope.error.unwrap_or_else(|| "scrape failed".to_string()),
            );
        }

        let data = envelope.data.unwrap_or_default();
        let content = data
            .markdown
            .or(data.html)
            .unwrap_or_default();

        ScrapeResult {
            success: true,
            url: url.to_string(),
            content,
            metadata: data.metadata,
            source: "firecrawl".to_string(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_degrades() {
        let client = FirecrawlClient::new(None).unwrap();
        assert!(!client.available());

        let result = client.scrape("https://acme.test", &[]).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("not configured"));
        assert_eq!(result.url, "https://acme.test");
    }
}
