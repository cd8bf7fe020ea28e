//! Integration tests for report generation and download.

mod common;

use std::io::{Cursor, Read};

use axum::http::{header, StatusCode};
use common::{body_json, get, post_json};
use http_body_util::BodyExt;
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: A generated report downloads as a .docx with the content inside
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_then_download() {
    let app = common::build_test_app(common::empty_state());

    let response = post_json(
        app.clone(),
        "/api/reports",
        json!({
            "report_type": "fraud_analysis",
            "subject": "S-123",
            "content": {"risk_level": "HIGH", "recommendations": ["Block card"]},
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["success"], true);
    let filename = created["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".docx"));
    let url = created["download_url"].as_str().unwrap().to_string();

    let response = get(app, &url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .contains("wordprocessingml"));
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains(&filename));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();
    assert!(document.contains("Fraud Analysis Report"));
    assert!(document.contains("Block card"));
}

// ---------------------------------------------------------------------------
// Test: Unknown download id is 404, missing content is 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_report_is_404() {
    let response = get(
        common::build_test_app(common::empty_state()),
        "/api/reports/7f1c1a9e-5b7e-4c84-9a43-2a4c0f0b8d11",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_without_content_is_rejected() {
    let response = post_json(
        common::build_test_app(common::empty_state()),
        "/api/reports",
        json!({"report_type": "order_validation"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing required fields: content");
}
