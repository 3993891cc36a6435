//! Perplexity verified-answer client.
//!
//! Perplexity returns AI-synthesized answers with source citations, which
//! makes it the fact-checking leg of the multi-source pattern.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::llm::json::parse_json_payload;

use super::{AnswerEngine, AnswerResponse, AnswerSource, FactCheckResponse, Recency};

const QUERY_TIMEOUT_SECS: u64 = 30;

/// Client for the Perplexity chat-completions API.
pub struct PerplexityClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: Client,
}

impl PerplexityClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.perplexity.ai";
    const DEFAULT_MODEL: &'static str = "sonar-pro";

    /// Create a client; without an API key every query degrades to a failure
    /// result.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        if api_key.is_none() {
            warn!("perplexity API key not set - verification will be unavailable");
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::provider("perplexity", format!("http client: {e}")))?;
        Ok(Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            http,
        })
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn chat(&self, system: &str, user: &str, recency: Recency) -> AnswerResponse {
        let Some(api_key) = &self.api_key else {
            return AnswerResponse::failure("perplexity API not configured");
        };

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: system,
                },
                ChatRequestMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: 2000,
            temperature: 0.2,
            search_recency_filter: recency.as_str(),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                return AnswerResponse::failure(format!(
                    "perplexity returned status {}",
                    response.status()
                ));
            }
            Err(e) => return AnswerResponse::failure(e.to_string()),
        };

        let envelope: ChatEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => return AnswerResponse::failure(format!("decode: {e}")),
        };

        let answer = envelope
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        AnswerResponse {
            success: true,
            answer,
            sources: envelope
                .citations
                .into_iter()
                .map(|url| AnswerSource {
                    url,
                    title: String::new(),
                    date: None,
                })
                .collect(),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    search_recency_filter: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl AnswerEngine for PerplexityClient {
    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn query(&self, query: &str, recency: Recency, _num_results: usize) -> AnswerResponse {
        info!(query, "perplexity query");
        self.chat(
            "You are a precise fact-checker. Provide accurate information with specific sources.",
            query,
            recency,
        )
        .await
    }

    async fn verify_fact(&self, claim: &str, context: &str) -> FactCheckResponse {
        info!(claim, "perplexity fact check");
        let prompt = format!(
            "Verify this claim: {claim}\n\nContext: {context}\n\n\
             Respond with ONLY a JSON object:\n\
             {{\"verified\": true/false, \"confidence\": 0.0-1.0, \"explanation\": \"...\"}}"
        );

        let response = self
            .chat("You are a precise fact-checker.", &prompt, Recency::Month)
            .await;
        if !response.success {
            return FactCheckResponse::failure(
                response.error.unwrap_or_else(|| "query failed".to_string()),
            );
        }

        match parse_json_payload(&response.answer) {
            Ok(parsed) => FactCheckResponse {
                success: true,
                verified: parsed["verified"].as_bool().unwrap_or(false),
                confidence: parsed["confidence"].as_f64().unwrap_or(0.0),
                verification_result: parsed["explanation"]
                    .as_str()
                    .unwrap_or(&response.answer)
                    .to_string(),
                sources: response.sources,
                error: None,
            },
            // Unstructured answer: keep the text, claim stays unvouched.
            Err(_) => FactCheckResponse {
                success: true,
                verified: false,
                confidence: 0.0,
                verification_result: response.answer,
                sources: response.sources,
                error: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_degrades() {
        let client = PerplexityClient::new(None).unwrap();
        assert!(!client.available());

        let result = client
            .query("What is Acme's annual revenue?", Recency::Month, 5)
            .await;
        assert!(!result.success);

        let check = client.verify_fact("Acme revenue is $100M", "SaaS company").await;
        assert!(!check.success);
        assert!(!check.verified);
    }
}
