//! Jenkins job catalog, triggering and build tracking.

use std::sync::Arc;

use beacon_connectors::jenkins::{JenkinsClient, JenkinsError};
use beacon_core::jenkins_jobs::{
    job_catalog, missing_parameters, next_steps, trigger_form, BuildStatus, JenkinsJobSummary,
    JobConfig, JobParameters, QueueStatus, PARAM_EMAIL_ID,
};
use beacon_core::masking::{mask_sensitive, SensitiveKind};
use chrono::Utc;
use serde_json::{json, Map, Value};

fn failure(error: String) -> Value {
    json!({ "success": false, "error": error })
}

/// Body of `GET /api/jenkins/jobs`. Needs no Jenkins connection.
pub fn catalog_response() -> Value {
    let jobs: Map<String, Value> = job_catalog()
        .iter()
        .map(|job| (job.job_type.to_string(), json!(job)))
        .collect();
    json!({ "success": true, "jobs": jobs })
}

pub struct JenkinsService {
    client: Arc<JenkinsClient>,
}

impl JenkinsService {
    pub fn new(client: Arc<JenkinsClient>) -> Self {
        Self { client }
    }

    pub async fn job_info(&self, job: &JobConfig) -> Value {
        let job_json = match self.client.job_info(job.job_name).await {
            Ok(v) => v,
            Err(JenkinsError::NotFound(_)) => {
                return failure(format!("Job not found: {}", job.job_name));
            }
            Err(JenkinsError::Api { status, .. }) => {
                return failure(format!("Failed to get job info: HTTP {status}"));
            }
            Err(e) => {
                tracing::error!(job = job.job_name, error = %e, "Jenkins job info failed");
                return failure(format!("Failed to get job information: {e}"));
            }
        };

        let summary = JenkinsJobSummary::from_json(&job_json);
        let last_build_info = match summary.last_build.and_then(|n| u64::try_from(n).ok()) {
            Some(n) => self.client.last_build_info(job.job_name, n).await,
            None => None,
        };

        json!({
            "success": true,
            "job_type": job.job_type,
            "job_name": job.job_name,
            "display_name": job.display_name,
            "description": job.description,
            "icon": job.icon,
            "estimated_runtime": job.estimated_runtime,
            "parameters": job.parameters,
            "jenkins_info": summary,
            "last_build_info": last_build_info,
        })
    }

    pub async fn trigger(&self, job: &JobConfig, params: &JobParameters) -> Value {
        let missing = missing_parameters(job, params);
        if !missing.is_empty() {
            return failure(format!("Missing required parameters: {}", missing.join(", ")));
        }

        let triggered_at = Utc::now();
        let form = trigger_form(job, params, triggered_at);
        let notify = params
            .get(PARAM_EMAIL_ID)
            .map(|email| mask_sensitive(email.trim(), SensitiveKind::Email))
            .unwrap_or_default();
        tracing::info!(job = job.job_name, %notify, "Triggering Jenkins job");

        match self.client.trigger(job.job_name, &form).await {
            Ok(queue_location) => {
                tracing::info!(job = job.job_name, ?queue_location, "Jenkins job queued");
                json!({
                    "success": true,
                    "job_type": job.job_type,
                    "job_name": job.job_name,
                    "display_name": job.display_name,
                    "message": format!("Job {} triggered successfully", job.display_name),
                    "parameters": params,
                    "queue_location": queue_location,
                    "estimated_runtime": job.estimated_runtime,
                    "triggered_at": triggered_at,
                    "status": "triggered",
                    "next_steps": next_steps(job, params),
                })
            }
            Err(e) => {
                tracing::error!(job = job.job_name, error = %e, "Jenkins trigger failed");
                failure(match e {
                    JenkinsError::Unauthorized => "Authentication failed: Invalid credentials".to_string(),
                    JenkinsError::Forbidden => {
                        "Access denied: Insufficient permissions to trigger job".to_string()
                    }
                    JenkinsError::NotFound(_) => format!("Job not found: {}", job.job_name),
                    JenkinsError::Api { status, .. } => format!("Failed to trigger job: HTTP {status}"),
                    other => format!("Failed to trigger job: {other}"),
                })
            }
        }
    }

    pub async fn build_status(&self, job: &JobConfig, build_number: u64) -> Value {
        match self.client.build_info(job.job_name, build_number).await {
            Ok(build) => json!(BuildStatus::from_json(job, build_number, &build)),
            Err(e) => {
                tracing::error!(job = job.job_name, build_number, error = %e, "Build status failed");
                failure(format!("Failed to get build status: {e}"))
            }
        }
    }

    pub async fn queue_status(&self, queue_location: &str) -> Value {
        match self.client.queue_item(queue_location).await {
            Ok(item) => json!(QueueStatus::from_json(&item)),
            Err(e) => {
                tracing::error!(%queue_location, error = %e, "Queue status failed");
                failure(format!("Failed to get queue status: {e}"))
            }
        }
    }

    pub async fn probe(&self) -> Value {
        match self.client.server_info().await {
            Ok(info) => {
                let text = |key: &str| {
                    info.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown")
                        .to_string()
                };
                json!({
                    "success": true,
                    "message": "Jenkins connection successful",
                    "jenkins_version": text("version"),
                    "mode": text("mode"),
                    "node_name": text("nodeName"),
                    "num_executors": info.get("numExecutors").and_then(Value::as_i64).unwrap_or(0),
                })
            }
            Err(JenkinsError::Request(e)) => failure(format!("Connection failed: {e}")),
            Err(e) => failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_keyed_by_job_type() {
        let body = catalog_response();
        let job = &body["jobs"]["fraud_story_prediction"];
        assert_eq!(job["display_name"], "Fraud Story Prediction");
        assert_eq!(job["parameters"], json!(["enterprise_release", "email_id"]));
        assert!(job.get("job_name").is_none());
    }
}
