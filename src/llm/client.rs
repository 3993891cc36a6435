//! Language-model capability trait and the Anthropic-backed implementation.
//!
//! The planner, executor fallback, validator, and LLM-shaped skills all
//! receive this single capability; tests supply deterministic stubs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};

use super::types::{ChatRole, CompletionRequest, CompletionResponse, TokenUsage};

/// A component that can complete prompts.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a request, returning the model's text output.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Configuration for HTTP-backed language-model clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key.
    pub api_key: String,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Default model used when a request carries none.
    pub default_model: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Max retries on transient failure.
    pub max_retries: u32,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            default_model: None,
            timeout_secs: 120,
            max_retries: 3,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Anthropic Claude client.
pub struct AnthropicClient {
    config: ClientConfig,
    http: Client,
}

impl AnthropicClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    const API_VERSION: &'static str = "2023-06-01";
    const DEFAULT_MODEL: &'static str = "claude-3-5-sonnet-20241022";

    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::provider("anthropic", format!("http client: {e}")))?;
        Ok(Self { config, http })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }

    fn model_for(&self, request: &CompletionRequest) -> String {
        request
            .model
            .clone()
            .or_else(|| self.config.default_model.clone())
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string())
    }
}

// Anthropic messages-API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = AnthropicRequest {
            model: self.model_for(&request),
            messages: request
                .messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: match m.role {
                        ChatRole::Assistant => "assistant".to_string(),
                        _ => "user".to_string(),
                    },
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            temperature: request.temperature,
        };

        let url = format!("{}/v1/messages", self.base_url());
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
            }

            let response = self
                .http
                .post(&url)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", Self::API_VERSION)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    let parsed: AnthropicResponse = response
                        .json()
                        .await
                        .map_err(|e| Error::provider("anthropic", format!("decode: {e}")))?;
                    let content = parsed
                        .content
                        .iter()
                        .filter(|c| c.content_type == "text")
                        .map(|c| c.text.as_str())
                        .collect::<Vec<_>>()
                        .join("");
                    return Ok(CompletionResponse {
                        content,
                        model: parsed.model,
                        stop_reason: parsed.stop_reason,
                        usage: TokenUsage {
                            input_tokens: parsed.usage.input_tokens,
                            output_tokens: parsed.usage.output_tokens,
                        },
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    let error =
                        Error::provider("anthropic", format!("status {status}: {text}"));
                    if !retryable {
                        return Err(error);
                    }
                    warn!(attempt, %status, "anthropic request failed, retrying");
                    last_error = Some(error);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "anthropic request failed, retrying");
                    last_error = Some(Error::provider("anthropic", e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::provider("anthropic", "retries exhausted")))
    }
}


#[cfg(test)]
mod tests {
    use super::stubs::ScriptedModel;
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec!["first", "second"]);
        let a = model
            .complete(CompletionRequest::from_prompt("x"))
            .await
            .unwrap();
        let b = model
            .complete(CompletionRequest::from_prompt("y"))
            .await
            .unwrap();
        let c = model
            .complete(CompletionRequest::from_prompt("z"))
            .await
            .unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(c.content, "second");
    }

    #[test]
    fn test_model_resolution_order() {
        let client = AnthropicClient::new(
            ClientConfig::new("key").with_default_model("claude-3-5-haiku-20241022"),
        )
        .unwrap();
        let request = CompletionRequest::from_prompt("x");
        assert_eq!(client.model_for(&request), "claude-3-5-haiku-20241022");
        let request = request.with_model("claude-3-opus-20240229");
        assert_eq!(client.model_for(&request), "claude-3-opus-20240229");
    }
}
