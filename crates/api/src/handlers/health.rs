use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::ConfiguredFlags;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceFlags {
    pub order_validator: bool,
    pub jira_service: bool,
    pub security_service: bool,
    pub log_service: bool,
    pub fraud_service: bool,
    pub jenkins_service: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(flatten)]
    pub configured: ConfiguredFlags,
    pub services: ServiceFlags,
}

/// GET /api/health -- configuration flags; contacts no downstream.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        configured: state.flags,
        services: ServiceFlags {
            order_validator: state.orders.is_some(),
            jira_service: state.jira.is_some(),
            security_service: state.security.is_some(),
            log_service: state.logs.is_some(),
            fraud_service: state.fraud.is_some(),
            jenkins_service: state.jenkins.is_some(),
        },
    })
}

fn not_initialized() -> Value {
    json!({ "success": false, "error": "Service not initialized" })
}

/// GET /api/test-connections -- probe every downstream concurrently.
pub async fn test_connections(State(state): State<AppState>) -> Json<Value> {
    let jira = async {
        match &state.jira {
            Some(jira) => jira.probe().await,
            None => not_initialized(),
        }
    };
    let database = async {
        match &state.orders {
            Some(orders) => orders.probe().await,
            None => not_initialized(),
        }
    };
    let elasticsearch = async {
        match &state.logs {
            Some(logs) => logs.probe().await,
            None => not_initialized(),
        }
    };
    let jenkins = async {
        match &state.jenkins {
            Some(jenkins) => jenkins.probe().await,
            None => not_initialized(),
        }
    };

    let (jira, database, elasticsearch, jenkins) = tokio::join!(jira, database, elasticsearch, jenkins);
    Json(json!({
        "jira": jira,
        "database": database,
        "elasticsearch": elasticsearch,
        "jenkins": jenkins,
    }))
}
