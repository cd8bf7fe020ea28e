//! Order validation against the order store.

use std::sync::Arc;

use beacon_core::order_validation::{MandatoryFieldPolicy, OrderRecord, OrderValidationReport};
use beacon_db::OrderStore;
use serde::Serialize;
use serde_json::{json, Value};

/// Response body of an order lookup without validation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderInfo {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_data: Option<OrderRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    policy: MandatoryFieldPolicy,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, policy: MandatoryFieldPolicy) -> Self {
        tracing::info!(policy = policy.as_str(), "Order validator ready");
        Self { store, policy }
    }

    /// Fetch the order and check its mandatory fields. Identifiers are used
    /// exactly as given; callers normalize them.
    pub async fn validate_order(&self, order_number: &str, location_code: &str) -> OrderValidationReport {
        tracing::info!(%order_number, %location_code, "Validating order");

        match self.store.find_order(order_number, location_code).await {
            Ok(Some(record)) => {
                let report = OrderValidationReport::found(order_number, location_code, &self.policy, record);
                if let Some(validation) = &report.validation {
                    if validation.summary.mandatory_fields == 0 {
                        tracing::warn!(
                            %order_number,
                            policy = self.policy.as_str(),
                            "No mandatory fields apply; order is trivially valid"
                        );
                    }
                    tracing::debug!(
                        %order_number,
                        is_valid = validation.is_valid,
                        missing = validation.missing_fields.len(),
                        "Order validated"
                    );
                }
                report
            }
            Ok(None) => {
                tracing::info!(%order_number, %location_code, "Order not found");
                OrderValidationReport::not_found(order_number, location_code)
            }
            Err(e) => {
                tracing::error!(%order_number, error = %e, "Order lookup failed");
                OrderValidationReport::failed(order_number, location_code, format!("Validation failed: {e}"))
            }
        }
    }

    /// The order row without validation.
    pub async fn order_info(&self, order_number: &str, location_code: &str) -> OrderInfo {
        match self.store.find_order(order_number, location_code).await {
            Ok(Some(record)) => OrderInfo {
                success: true,
                order_data: Some(record),
                error: None,
            },
            Ok(None) => OrderInfo {
                success: false,
                order_data: None,
                error: Some("Order not found".to_string()),
            },
            Err(e) => {
                tracing::error!(%order_number, error = %e, "Order lookup failed");
                OrderInfo {
                    success: false,
                    order_data: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn probe(&self) -> Value {
        match self.store.probe().await {
            Ok(probe) => {
                let mut body = json!({ "success": true });
                if let (Some(obj), Ok(Value::Object(fields))) = (body.as_object_mut(), serde_json::to_value(&probe)) {
                    obj.extend(fields);
                }
                body
            }
            Err(e) => json!({
                "success": false,
                "error": format!("Database connection failed: {e}"),
            }),
        }
    }
}
