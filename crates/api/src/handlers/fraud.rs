use axum::extract::State;
use axum::Json;
use beacon_core::error::CoreError;
use beacon_core::fraud::{fraud_type_catalog, FraudAnalysisReport, FraudType};
use beacon_core::request_fields::{is_provided, require_fields};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::handlers::{field_text, JsonBody};
use crate::services::jwt::JwtReport;
use crate::state::{require_service, AppState};

/// GET /api/fraud-types
pub async fn fraud_types() -> Json<Value> {
    Json(json!({ "success": true, "fraud_types": fraud_type_catalog() }))
}

/// POST /api/fraud-analysis
pub async fn fraud_analysis(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AppResult<Json<FraudAnalysisReport>> {
    let fraud = require_service(&state.fraud, "Fraud analysis")?;
    require_fields(&body, &["session_id", "fraud_type"])?;

    let requested = field_text(&body, "fraud_type");
    let fraud_type = FraudType::from_str_value(&requested)
        .ok_or_else(|| CoreError::Validation(format!("Unknown fraud type: {requested}")))?;

    Ok(Json(
        fraud
            .analyze_session(&field_text(&body, "session_id"), fraud_type)
            .await,
    ))
}

/// String items of a field holding either one string or an array.
fn string_list(body: &Value, field: &str) -> Vec<String> {
    match body.get(field) {
        Some(Value::String(s)) => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// POST /api/jwt-analysis
///
/// Either `tokens` (one string or a list) or a `session_id` whose logs are
/// searched for tokens, optionally limited to `log_types`.
pub async fn jwt_analysis(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AppResult<Json<JwtReport>> {
    if !body.is_object() {
        return Err(CoreError::Validation("Request data is missing".into()).into());
    }

    if body.get("tokens").is_some_and(is_provided) {
        return Ok(Json(state.jwt.inspect(&string_list(&body, "tokens"))));
    }

    require_fields(&body, &["session_id"])?;
    state
        .jwt
        .inspect_session(&field_text(&body, "session_id"), &string_list(&body, "log_types"))
        .await
        .map(Json)
        .ok_or(AppError::ServiceUnavailable("Log search"))
}
