//! HTTP handlers. Each one checks its input, picks the service from
//! [`AppState`](crate::state::AppState) and returns the service's body.

pub mod fraud;
pub mod health;
pub mod jenkins;
pub mod jira;
pub mod logs;
pub mod orders;
pub mod reports;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde_json::Value;

use crate::error::AppError;

/// A JSON request body of any shape. An empty body is `null`, which the
/// required-field check reports as missing request data.
#[derive(Debug)]
pub struct JsonBody(pub Value);

impl<S: Send + Sync> FromRequest<S> for JsonBody {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Value::Null));
        }
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
    }
}

/// A provided field as text: strings trimmed, numbers and booleans rendered.
/// Call after the required-field check.
pub(crate) fn field_text(body: &Value, field: &str) -> String {
    match body.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
