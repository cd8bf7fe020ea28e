use axum::extract::{Path, State};
use axum::Json;
use beacon_connectors::jira::DEFAULT_MAX_RESULTS;
use beacon_core::error::CoreError;
use beacon_core::jql::is_issue_key;
use beacon_core::request_fields::require_fields;
use serde_json::Value;

use crate::error::AppResult;
use crate::handlers::{field_text, JsonBody};
use crate::services::security::SecurityAnalysisResult;
use crate::state::{require_service, AppState};

fn max_results(body: &Value) -> AppResult<u32> {
    match body.get("max_results") {
        None | Some(Value::Null) => Ok(DEFAULT_MAX_RESULTS),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| CoreError::Validation("max_results must be a positive integer".into()).into()),
    }
}

/// Upper-cased issue key, or 400 when it is not `PROJ-123` shaped.
fn issue_key(raw: &str) -> AppResult<String> {
    let key = raw.trim().to_uppercase();
    if !is_issue_key(&key) {
        return Err(CoreError::Validation(format!("Invalid issue key: {}", raw.trim())).into());
    }
    Ok(key)
}

/// POST /api/query
pub async fn query(State(state): State<AppState>, JsonBody(body): JsonBody) -> AppResult<Json<Value>> {
    let jira = require_service(&state.jira, "Jira")?;
    require_fields(&body, &["query"])?;
    let max_results = max_results(&body)?;
    Ok(Json(jira.process_query(&field_text(&body, "query"), max_results).await))
}

/// GET /api/issues/{key}
pub async fn get_issue(State(state): State<AppState>, Path(key): Path<String>) -> AppResult<Json<Value>> {
    let jira = require_service(&state.jira, "Jira")?;
    let key = issue_key(&key)?;
    Ok(Json(jira.issue(&key).await))
}

/// POST /api/security-analysis
pub async fn security_analysis(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AppResult<Json<SecurityAnalysisResult>> {
    let security = require_service(&state.security, "Security analysis")?;
    require_fields(&body, &["issue_key"])?;
    let key = issue_key(&field_text(&body, "issue_key"))?;
    Ok(Json(security.analyze_issue(&key).await))
}
