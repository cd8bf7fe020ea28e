use axum::extract::{Path, State};
use axum::Json;
use beacon_core::jenkins_jobs::{find_job, validate_parameters, JobParameters, ParameterValidation};
use beacon_core::request_fields::require_fields;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::handlers::{field_text, JsonBody};
use crate::services::jenkins::catalog_response;
use crate::state::{require_service, AppState};

const JENKINS: &str = "Jenkins";

/// `parameters` object of the body; scalar values are rendered as text.
fn job_parameters(body: &Value) -> AppResult<JobParameters> {
    match body.get("parameters") {
        None | Some(Value::Null) => Ok(JobParameters::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let text = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                (k.clone(), text)
            })
            .collect()),
        Some(_) => Err(AppError::BadRequest("parameters must be an object".into())),
    }
}

/// GET /api/jenkins/jobs
pub async fn list_jobs() -> Json<Value> {
    Json(catalog_response())
}

/// GET /api/jenkins/jobs/{job_type}
pub async fn job_info(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
) -> AppResult<Json<Value>> {
    let jenkins = require_service(&state.jenkins, JENKINS)?;
    let job = find_job(&job_type)?;
    Ok(Json(jenkins.job_info(job).await))
}

/// POST /api/jenkins/validate-parameters
pub async fn validate_job_parameters(JsonBody(body): JsonBody) -> AppResult<Json<ParameterValidation>> {
    require_fields(&body, &["job_type"])?;
    let job = find_job(&field_text(&body, "job_type"))?;
    Ok(Json(validate_parameters(job, &job_parameters(&body)?)))
}

/// POST /api/jenkins-trigger-job
pub async fn trigger_job(State(state): State<AppState>, JsonBody(body): JsonBody) -> AppResult<Json<Value>> {
    let jenkins = require_service(&state.jenkins, JENKINS)?;
    require_fields(&body, &["job_type"])?;
    let job = find_job(&field_text(&body, "job_type"))?;
    Ok(Json(jenkins.trigger(job, &job_parameters(&body)?).await))
}

/// GET /api/jenkins/builds/{job_type}/{build_number}
pub async fn build_status(
    State(state): State<AppState>,
    Path((job_type, build_number)): Path<(String, u64)>,
) -> AppResult<Json<Value>> {
    let jenkins = require_service(&state.jenkins, JENKINS)?;
    let job = find_job(&job_type)?;
    Ok(Json(jenkins.build_status(job, build_number).await))
}

/// POST /api/jenkins/queue-status
pub async fn queue_status(State(state): State<AppState>, JsonBody(body): JsonBody) -> AppResult<Json<Value>> {
    let jenkins = require_service(&state.jenkins, JENKINS)?;
    require_fields(&body, &["queue_location"])?;
    Ok(Json(jenkins.queue_status(&field_text(&body, "queue_location")).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parameters_are_rendered_as_text() {
        let body = json!({"parameters": {"enterprise_release": 2024.1, "email_id": "a@b.com", "x": null}});
        let params = job_parameters(&body).unwrap();
        assert_eq!(params["enterprise_release"], "2024.1");
        assert_eq!(params["email_id"], "a@b.com");
        assert!(!params.contains_key("x"));
    }

    #[test]
    fn non_object_parameters_are_rejected() {
        assert_matches!(job_parameters(&json!({"parameters": [1]})), Err(AppError::BadRequest(_)));
    }
}
