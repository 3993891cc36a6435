//! Language-model capability: the trait the core components depend on, the
//! HTTP-backed Anthropic client, and output-parsing helpers.

mod client;
pub mod json;
mod types;

pub use client::{AnthropicClient, ClientConfig, LanguageModel};
pub use types::{ChatMessage, ChatRole, CompletionRequest, CompletionResponse, TokenUsage};

#[cfg(test)]
pub(crate) use client::stubs;

/// Clip text for prompt inclusion, cutting at a char boundary and appending
/// a truncation marker.
pub fn truncate_for_prompt(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated)", &text[..cut])
}
