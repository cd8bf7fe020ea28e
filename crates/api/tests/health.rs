//! Integration tests for the health endpoints and general HTTP behaviour.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use beacon_core::order_validation::MandatoryFieldPolicy;
use common::{body_json, get, FakeLogSearch, FakeOrderStore};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /api/health reports configuration and service flags
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_flags() {
    let mut state = common::empty_state();
    state.flags.database_configured = true;
    let state = common::with_orders(
        state,
        Arc::new(FakeOrderStore::default()),
        MandatoryFieldPolicy::default_allowlist(),
    );

    let response = get(common::build_test_app(state), "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
    assert_eq!(json["database_configured"], true);
    assert_eq!(json["jira_configured"], false);
    assert_eq!(json["services"]["order_validator"], true);
    assert_eq!(json["services"]["jira_service"], false);
}

// ---------------------------------------------------------------------------
// Test: test-connections marks unconfigured services as not initialized
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_connections_probes_configured_services() {
    let state = common::with_logs(common::empty_state(), FakeLogSearch::default(), None);
    let response = get(common::build_test_app(state), "/api/test-connections").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["jira"]["success"], false);
    assert_eq!(json["jira"]["error"], "Service not initialized");
    assert_eq!(json["database"]["error"], "Service not initialized");
    assert_eq!(json["jenkins"]["success"], false);
    assert_eq!(json["elasticsearch"]["success"], true);
    assert_eq!(json["elasticsearch"]["cluster_name"], "test");
    assert_eq!(json["elasticsearch"]["elasticsearch_version"], "8.11.0");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let response = get(common::build_test_app(common::empty_state()), "/api/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let response = get(common::build_test_app(common::empty_state()), "/api/health").await;

    let request_id = response.headers().get("x-request-id");
    assert!(request_id.is_some(), "Response must contain an x-request-id header");
    assert_eq!(request_id.unwrap().to_str().unwrap().len(), 36);
}

// ---------------------------------------------------------------------------
// Test: CORS preflight allows the configured origin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/validate-order")
        .header("Origin", "http://localhost:5000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = common::build_test_app(common::empty_state())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:5000"
    );
}
