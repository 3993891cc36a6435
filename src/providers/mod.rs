//! External data-provider interfaces consumed by skills.
//!
//! Each provider is a thin adapter around an HTTP API. Failures degrade
//! gracefully: clients report `{success: false, error}` rather than erroring,
//! so skills can fall back to their knowledge-base-only paths.

mod exa;
mod firecrawl;
mod perplexity;

pub use exa::ExaClient;
pub use firecrawl::FirecrawlClient;
pub use perplexity::PerplexityClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of scraping one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    /// Which backend produced the content.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            content: String::new(),
            metadata: Value::Null,
            source: String::new(),
            error: Some(error.into()),
        }
    }
}

/// One semantic-search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Result of a semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Recency window for verified-answer queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recency {
    Day,
    Week,
    Month,
    Year,
}

impl Recency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// A citation attached to a verified answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSource {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Result of a verified-answer query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub success: bool,
    pub answer: String,
    pub sources: Vec<AnswerSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: String::new(),
            sources: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Result of checking one claim against the live web.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResponse {
    pub success: bool,
    pub verified: bool,
    pub confidence: f64,
    pub verification_result: String,
    pub sources: Vec<AnswerSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FactCheckResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            verified: false,
            confidence: 0.0,
            verification_result: String::new(),
            sources: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Web scraping (JavaScript rendering, markdown conversion).
#[async_trait]
pub trait WebScraper: Send + Sync {
    /// Whether the backend is configured and callable.
    fn available(&self) -> bool;

    /// Scrape a single URL into the requested formats.
    async fn scrape(&self, url: &str, formats: &[&str]) -> ScrapeResult;
}

/// Neural/semantic search over web content.
#[async_trait]
pub trait NeuralSearch: Send + Sync {
    fn available(&self) -> bool;

    /// Semantic search for relevant content.
    async fn search(&self, query: &str, num_results: usize) -> SearchResponse;

    /// Find pages similar to a given URL (competitor discovery).
    async fn find_similar(&self, url: &str, num_results: usize) -> SearchResponse;

    /// Recent news mentioning a company.
    async fn company_news(&self, company: &str, num_results: usize, days: u32) -> SearchResponse;
}

/// Search with synthesized, citation-backed answers.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    fn available(&self) -> bool;

    /// Ask a question, preferring results within the recency window.
    async fn query(&self, query: &str, recency: Recency, num_results: usize) -> AnswerResponse;

    /// Check a specific claim against the live web.
    async fn verify_fact(&self, claim: &str, context: &str) -> FactCheckResponse;
}
