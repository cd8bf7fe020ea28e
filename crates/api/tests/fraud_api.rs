//! Integration tests for log search, fraud analysis and JWT inspection.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use beacon_api::services::fraud::AiBudget;
use beacon_connectors::llm::ChatModel;
use common::{body_json, get, post_json, FakeChatModel, FakeLogSearch};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

fn token(claims: Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"unused")).unwrap()
}

fn session_logs() -> FakeLogSearch {
    FakeLogSearch::default()
        .with_index(
            "logs-fraud-detection-*",
            vec![json!({
                "@timestamp": "2024-05-01T10:00:02Z",
                "level": "INFO",
                "message": "velocity_check completed",
                "component": "fraud-engine",
                "riskScore": 35,
                "decision": "APPROVE",
            })],
        )
        .with_index(
            "logs-api-gateway-*",
            vec![json!({
                "@timestamp": "2024-05-01T10:00:01Z",
                "level": "ERROR",
                "message": "identity_check failed: token expired",
                "component": "gateway",
                "apiEndpoint": "/v1/identity",
                "httpMethod": "POST",
                "statusCode": 401,
            })],
        )
}

// ---------------------------------------------------------------------------
// Test: search-logs formats hits and reports the index
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_logs_formats_hits() {
    let state = common::with_logs(common::empty_state(), session_logs(), None);

    let response = post_json(
        common::build_test_app(state),
        "/api/search-logs",
        json!({"log_type": "api-gateway", "session_id": "S1", "filters": {"time_range": "1h"}}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["index_searched"], "logs-api-gateway-*");
    assert_eq!(json["results"][0]["api_endpoint"], "/v1/identity");
    assert_eq!(json["filters_applied"]["time_range"], "1h");
}

#[tokio::test]
async fn unknown_log_type_is_rejected() {
    let state = common::with_logs(common::empty_state(), FakeLogSearch::default(), None);

    let response = post_json(
        common::build_test_app(state),
        "/api/search-logs",
        json!({"log_type": "mainframe", "session_id": "S1"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Unknown log type: mainframe");
}

#[tokio::test]
async fn log_types_lists_configuration() {
    let state = common::with_logs(common::empty_state(), FakeLogSearch::default(), None);

    let json = body_json(get(common::build_test_app(state), "/api/log-types").await).await;
    assert_eq!(json["log_types"]["3d-secure"]["index"], "logs-3d-secure-*");
    assert_eq!(json["log_types"].as_object().unwrap().len(), 6);
}

// ---------------------------------------------------------------------------
// Test: fraud analysis over gathered logs, with model failures falling back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fraud_analysis_falls_back_when_model_fails() {
    let llm = Arc::new(FakeChatModel::failing());
    let state = common::with_logs(
        common::empty_state(),
        session_logs(),
        Some(Arc::clone(&llm) as Arc<dyn ChatModel>),
    );

    let response = post_json(
        common::build_test_app(state),
        "/api/fraud-analysis",
        json!({"session_id": "S1", "fraud_type": "digital_fraud"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["fraud_type"], "digital_fraud");

    let analysis = &json["analysis"];
    assert_eq!(analysis["statistics"]["total_logs_analyzed"], 2);
    let calls = analysis["monitoring_analysis"]["api_call_analysis"].as_array().unwrap();
    assert_eq!(calls.len(), 2);
    // Chronological: the gateway entry is a second earlier.
    assert_eq!(calls[0]["call_type"], "identity_check");
    assert_eq!(calls[0]["analysis_source"], "heuristic");
    assert_eq!(calls[0]["is_successful"], false);
    assert_eq!(analysis["monitoring_analysis"]["ai_insights"]["confidence_level"], "low");
    assert!(analysis["risk_assessment"]["level"].is_string());

    // One call per entry plus the session insights.
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn slow_model_calls_stop_at_the_time_budget() {
    // The first entry's call is cut off, the second is never sent; the
    // session insights call still runs.
    let llm = Arc::new(FakeChatModel::slow("not json", Duration::from_millis(300)));
    let state = common::with_logs_budget(
        common::empty_state(),
        session_logs(),
        Some(Arc::clone(&llm) as Arc<dyn ChatModel>),
        AiBudget {
            max_calls: 50,
            max_time: Duration::from_millis(50),
        },
    );

    let json = body_json(
        post_json(
            common::build_test_app(state),
            "/api/fraud-analysis",
            json!({"session_id": "S1", "fraud_type": "digital_fraud"}),
        )
        .await,
    )
    .await;
    assert_eq!(json["success"], true);

    let calls = json["analysis"]["monitoring_analysis"]["api_call_analysis"].as_array().unwrap();
    assert_eq!(calls.len(), 2);
    for call in calls {
        assert_eq!(call["analysis_source"], "heuristic");
        assert_eq!(call["response_analysis"], "AI analysis skipped: per-session time budget spent");
    }
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn unknown_fraud_type_is_rejected() {
    let state = common::with_logs(common::empty_state(), session_logs(), None);

    let response = post_json(
        common::build_test_app(state),
        "/api/fraud-analysis",
        json!({"session_id": "S1", "fraud_type": "card_fraud"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fraud_analysis_requires_log_search() {
    let response = post_json(
        common::build_test_app(common::empty_state()),
        "/api/fraud-analysis",
        json!({"session_id": "S1", "fraud_type": "digital_fraud"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn fraud_types_catalog() {
    let json = body_json(get(common::build_test_app(common::empty_state()), "/api/fraud-types").await).await;
    let types = json["fraud_types"].as_object().unwrap();
    assert_eq!(types.len(), 4);
    assert!(types.contains_key("identity_fraud"));
}

// ---------------------------------------------------------------------------
// Test: JWT analysis of supplied tokens and of session logs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn jwt_analysis_of_supplied_tokens() {
    let a = token(json!({"sub": "user-1", "exp": 4_102_444_800_i64}));
    let b = token(json!({"sub": "user-2", "exp": 4_102_444_800_i64}));

    let response = post_json(
        common::build_test_app(common::empty_state()),
        "/api/jwt-analysis",
        json!({"tokens": [a, b]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let analysis = &json["analysis"];
    assert_eq!(analysis["trust_bearing"], false);
    assert_eq!(analysis["token_count"], 2);
    assert_eq!(analysis["identity_consistent"], false);
    assert_eq!(analysis["identity_mismatches"], json!(["sub"]));
}

#[tokio::test]
async fn jwt_analysis_of_session_logs() {
    let t = token(json!({"sub": "user-1"}));
    let search = FakeLogSearch::default().with_index(
        "logs-full-auth-*",
        vec![
            json!({"message": format!("Authorization: Bearer {t}"), "level": "INFO"}),
            json!({"message": "login ok", "headers": {"authorization": format!("Bearer {t}")}}),
        ],
    );
    let state = common::with_logs(common::empty_state(), search, None);

    let json = body_json(
        post_json(
            common::build_test_app(state),
            "/api/jwt-analysis",
            json!({"session_id": "S1", "log_types": ["full-auth"]}),
        )
        .await,
    )
    .await;
    assert_eq!(json["success"], true);
    assert_eq!(json["log_types_searched"], json!(["full-auth"]));
    assert_eq!(json["analysis"]["token_count"], 1);
    assert_eq!(json["analysis"]["identity_consistent"], true);
}

#[tokio::test]
async fn jwt_session_lookup_needs_log_search() {
    let response = post_json(
        common::build_test_app(common::empty_state()),
        "/api/jwt-analysis",
        json!({"session_id": "S1"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
