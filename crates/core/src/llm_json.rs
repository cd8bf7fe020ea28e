//! Recovering JSON objects from chat-model replies.
//!
//! Models asked to "return only JSON" still wrap answers in Markdown fences
//! or add a sentence before the object. [`extract_json_object`] strips that
//! noise; callers fall back to the raw text when it returns `None`.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse the first JSON object embedded in `reply`.
pub fn extract_json_object(reply: &str) -> Option<Value> {
    let trimmed = strip_code_fence(reply.trim());

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Parse the embedded JSON object straight into `T`.
pub fn extract_typed<T: DeserializeOwned>(reply: &str) -> Option<T> {
    extract_json_object(reply).and_then(|v| serde_json::from_value(v).ok())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
