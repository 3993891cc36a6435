//! Tolerant JSON extraction from model output.
//!
//! Models frequently wrap structured answers in markdown code fences or
//! surround them with prose; these helpers recover the JSON payload before
//! parsing.

use serde_json::Value;

use crate::error::Result;

/// Strip markdown code fences, returning the inner payload.
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let inner = &text[start + "```json".len()..];
        if let Some(end) = inner.find("```") {
            return inner[..end].trim();
        }
        return inner.trim();
    }
    if let Some(start) = text.find("```") {
        let inner = &text[start + 3..];
        if let Some(end) = inner.find("```") {
            return inner[..end].trim();
        }
        return inner.trim();
    }
    text.trim()
}

/// Parse a JSON value out of model output: fenced block first, then the
/// outermost braced/bracketed span as a last resort.
pub fn parse_json_payload(text: &str) -> Result<Value> {
    let candidate = extract_json_block(text);
    match serde_json::from_str(candidate) {
        Ok(value) => Ok(value),
        Err(err) => {
            // Prefer whichever structure opens first in the text.
            let mut spans = [('{', '}'), ('[', ']')];
            let brace = candidate.find('{').unwrap_or(usize::MAX);
            let bracket = candidate.find('[').unwrap_or(usize::MAX);
            if bracket < brace {
                spans.swap(0, 1);
            }

            for (open, close) in spans {
                if let (Some(start), Some(end)) =
                    (candidate.find(open), candidate.rfind(close))
                {
                    if start < end {
                        if let Ok(value) = serde_json::from_str(&candidate[start..=end]) {
                            return Ok(value);
                        }
                    }
                }
            }
            Err(err.into())
        }
    }
}
