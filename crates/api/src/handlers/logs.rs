use axum::extract::{Path, State};
use axum::Json;
use beacon_core::log_query::SearchFilters;
use beacon_core::request_fields::require_fields;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::handlers::{field_text, JsonBody};
use crate::state::{require_service, AppState};

const LOG_SEARCH: &str = "Log search";

/// GET /api/log-types
pub async fn log_types(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let logs = require_service(&state.logs, LOG_SEARCH)?;
    Ok(Json(json!({ "success": true, "log_types": logs.log_types() })))
}

/// GET /api/log-components/{log_type}
pub async fn log_components(
    State(state): State<AppState>,
    Path(log_type): Path<String>,
) -> AppResult<Json<Value>> {
    let logs = require_service(&state.logs, LOG_SEARCH)?;
    Ok(Json(logs.components(log_type.trim()).await?))
}

fn search_filters(body: &Value) -> AppResult<SearchFilters> {
    match body.get("filters") {
        None | Some(Value::Null) => Ok(SearchFilters::default()),
        Some(filters) => serde_json::from_value(filters.clone())
            .map_err(|e| AppError::BadRequest(format!("Invalid filters: {e}"))),
    }
}

/// POST /api/search-logs
pub async fn search_logs(State(state): State<AppState>, JsonBody(body): JsonBody) -> AppResult<Json<Value>> {
    let logs = require_service(&state.logs, LOG_SEARCH)?;
    require_fields(&body, &["log_type", "session_id"])?;
    let filters = search_filters(&body)?;
    let response = logs
        .search_response(
            &field_text(&body, "log_type"),
            &field_text(&body, "session_id"),
            &filters,
        )
        .await?;
    Ok(Json(response))
}
