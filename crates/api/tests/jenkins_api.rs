//! Integration tests for the Jenkins endpoints.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use beacon_api::services::jenkins::JenkinsService;
use beacon_api::state::AppState;
use beacon_connectors::jenkins::{JenkinsClient, JenkinsCredentials};
use common::{body_json, get as get_req, post_json, spawn};
use serde_json::json;

fn with_jenkins(base_url: String) -> AppState {
    let client = JenkinsClient::new(
        JenkinsCredentials {
            base_url,
            username: "ci".into(),
            api_token: "token".into(),
        },
        Duration::from_secs(5),
    )
    .unwrap();
    let mut state = common::empty_state();
    state.jenkins = Some(Arc::new(JenkinsService::new(Arc::new(client))));
    state
}

// ---------------------------------------------------------------------------
// Test: Job catalog and parameter validation need no Jenkins connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_catalog_lists_fraud_story_prediction() {
    let json = body_json(get_req(common::build_test_app(common::empty_state()), "/api/jenkins/jobs").await).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["jobs"]["fraud_story_prediction"]["estimated_runtime"], "5-10 minutes");
}

#[tokio::test]
async fn validate_parameters_reports_errors_and_warnings() {
    let response = post_json(
        common::build_test_app(common::empty_state()),
        "/api/jenkins/validate-parameters",
        json!({
            "job_type": "fraud_story_prediction",
            "parameters": {"enterprise_release": "R 2024/1", "email_id": "not-an-email"},
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"], json!(["Invalid email format"]));
    assert_eq!(json["warnings"], json!(["Enterprise release format seems unusual"]));
}

#[tokio::test]
async fn unknown_job_type_is_rejected() {
    let response = post_json(
        common::build_test_app(common::empty_state()),
        "/api/jenkins/validate-parameters",
        json!({"job_type": "deploy_prod"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Unknown job type: deploy_prod");
}

// ---------------------------------------------------------------------------
// Test: Trigger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_requires_jenkins() {
    let response = post_json(
        common::build_test_app(common::empty_state()),
        "/api/jenkins-trigger-job",
        json!({"job_type": "fraud_story_prediction"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn trigger_with_missing_parameters_is_not_sent() {
    // Nothing listens here; the request must never be made.
    let state = with_jenkins("http://127.0.0.1:9".to_string());

    let json = body_json(
        post_json(
            common::build_test_app(state),
            "/api/jenkins-trigger-job",
            json!({"job_type": "fraud_story_prediction", "parameters": {"email_id": "qa@example.com"}}),
        )
        .await,
    )
    .await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Missing required parameters: enterprise_release");
}

#[tokio::test]
async fn trigger_returns_queue_location() {
    let jenkins = Router::new().route(
        "/job/fraud-story-prediction/buildWithParameters",
        post(|| async {
            (
                StatusCode::CREATED,
                [(header::LOCATION, "http://jenkins.local/queue/item/42/")],
            )
        }),
    );
    let state = with_jenkins(spawn(jenkins).await);

    let json = body_json(
        post_json(
            common::build_test_app(state),
            "/api/jenkins-trigger-job",
            json!({
                "job_type": "fraud_story_prediction",
                "parameters": {"enterprise_release": "2024.1", "email_id": "qa@example.com"},
            }),
        )
        .await,
    )
    .await;
    assert_eq!(json["success"], true);
    assert_eq!(json["status"], "triggered");
    assert_eq!(json["queue_location"], "http://jenkins.local/queue/item/42/");
    assert_eq!(json["message"], "Job Fraud Story Prediction triggered successfully");
    assert_eq!(json["next_steps"][1], "Results will be sent to: qa@example.com");
}

// ---------------------------------------------------------------------------
// Test: Build status and job info
// ---------------------------------------------------------------------------

#[tokio::test]
async fn build_status_reads_parameters() {
    let jenkins = Router::new().route(
        "/job/fraud-story-prediction/7/api/json",
        get(|| async {
            Json(json!({
                "building": false,
                "result": "SUCCESS",
                "duration": 1200,
                "actions": [
                    {"_class": "hudson.model.ParametersAction",
                     "parameters": [{"name": "email_id", "value": "qa@example.com"}]}
                ],
            }))
        }),
    );
    let state = with_jenkins(spawn(jenkins).await);

    let json = body_json(
        get_req(common::build_test_app(state), "/api/jenkins/builds/fraud_story_prediction/7").await,
    )
    .await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["result"], "SUCCESS");
    assert_eq!(json["parameters"]["email_id"], "qa@example.com");
}

#[tokio::test]
async fn missing_job_is_reported() {
    let state = with_jenkins(spawn(Router::new()).await);

    let json = body_json(
        get_req(common::build_test_app(state), "/api/jenkins/jobs/fraud_story_prediction").await,
    )
    .await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Job not found: fraud-story-prediction");
}
