use axum::extract::State;
use axum::Json;
use beacon_core::order_validation::OrderValidationReport;
use beacon_core::request_fields::require_fields;
use serde_json::Value;

use crate::error::AppResult;
use crate::handlers::{field_text, JsonBody};
use crate::services::orders::OrderInfo;
use crate::state::{require_service, AppState};

const ORDER_FIELDS: &[&str] = &["order_number", "location_code"];

/// Trimmed order number and upper-cased location code.
fn order_key(body: &Value) -> AppResult<(String, String)> {
    require_fields(body, ORDER_FIELDS)?;
    Ok((
        field_text(body, "order_number"),
        field_text(body, "location_code").to_uppercase(),
    ))
}

/// POST /api/validate-order
pub async fn validate_order(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AppResult<Json<OrderValidationReport>> {
    let orders = require_service(&state.orders, "Order validation")?;
    let (order_number, location_code) = order_key(&body)?;
    Ok(Json(orders.validate_order(&order_number, &location_code).await))
}

/// POST /api/order-info
pub async fn order_info(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AppResult<Json<OrderInfo>> {
    let orders = require_service(&state.orders, "Order validation")?;
    let (order_number, location_code) = order_key(&body)?;
    Ok(Json(orders.order_info(&order_number, &location_code).await))
}
