use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use beacon_core::report_doc::{humanize_key, DOCX_CONTENT_TYPE};
use beacon_core::request_fields::{require_fields, trimmed_str};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::{field_text, JsonBody};
use crate::services::reports::GeneratedReport;
use crate::state::AppState;

/// POST /api/reports
///
/// `report_type` and `content` are required; `subject` names the analysed
/// item and `title` overrides the heading.
pub async fn create_report(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AppResult<Json<GeneratedReport>> {
    require_fields(&body, &["report_type", "content"])?;
    let kind = field_text(&body, "report_type");
    let subject = trimmed_str(&body, "subject").unwrap_or_else(|| "report".to_string());
    let title = trimmed_str(&body, "title").unwrap_or_else(|| format!("{} Report", humanize_key(&kind)));

    let report = state
        .reports
        .generate(&title, &kind, &subject, &body["content"])
        .await?;
    Ok(Json(report))
}

/// GET /api/reports/{id}
pub async fn download_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> AppResult<Response> {
    let report = state.reports.download(report_id).await?;
    let disposition = format!("attachment; filename=\"{}\"", report.filename);
    Ok((
        [(CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()), (CONTENT_DISPOSITION, disposition)],
        report.bytes,
    )
        .into_response())
}
