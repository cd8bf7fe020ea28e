//! Presence checks for JSON request bodies.

use serde_json::Value;

use crate::error::CoreError;

/// `true` when the value counts as provided: not null, not a blank string,
/// not an empty array or object.
pub fn is_provided(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Names from `required` that `body` does not provide, in the given order.
pub fn missing_fields<'a>(body: &Value, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|field| !body.get(*field).is_some_and(is_provided))
        .collect()
}

/// Reject a body lacking any of `required`:
/// `Missing required fields: a, b`.
pub fn require_fields(body: &Value, required: &[&str]) -> Result<(), CoreError> {
    if !body.is_object() {
        return Err(CoreError::Validation("Request data is missing".to_string()));
    }
    let missing = missing_fields(body, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Trimmed string field, `None` when absent or blank.
pub fn trimmed_str(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
