//! Jenkins job catalog, parameter validation and build JSON shaping.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use validator::ValidateEmail;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const JOB_FRAUD_STORY_PREDICTION: &str = "fraud_story_prediction";

pub const PARAM_ENTERPRISE_RELEASE: &str = "enterprise_release";
pub const PARAM_EMAIL_ID: &str = "email_id";

/// Value of the `triggered_by` build parameter.
pub const TRIGGERED_BY: &str = "Jira AI Assistant";

/// Email domains that do not produce an "unusual domain" warning.
const USUAL_EMAIL_SUFFIXES: &[&str] = &[".com", ".org", ".net", ".edu", ".gov"];

const PARAMETERS_ACTION_CLASS: &str = "hudson.model.ParametersAction";

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobConfig {
    #[serde(skip)]
    pub job_type: &'static str,
    /// Name of the job in Jenkins.
    #[serde(skip)]
    pub job_name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub parameters: &'static [&'static str],
    pub estimated_runtime: &'static str,
}

static JOBS: &[JobConfig] = &[JobConfig {
    job_type: JOB_FRAUD_STORY_PREDICTION,
    job_name: "fraud-story-prediction",
    display_name: "Fraud Story Prediction",
    description: "AI-powered fraud story prediction based on enterprise release data",
    icon: "🤖",
    parameters: &[PARAM_ENTERPRISE_RELEASE, PARAM_EMAIL_ID],
    estimated_runtime: "5-10 minutes",
}];

pub fn job_catalog() -> &'static [JobConfig] {
    JOBS
}

/// Look up a job by its type key.
pub fn find_job(job_type: &str) -> Result<&'static JobConfig, CoreError> {
    JOBS.iter()
        .find(|job| job.job_type == job_type)
        .ok_or_else(|| CoreError::Validation(format!("Unknown job type: {job_type}")))
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

pub type JobParameters = BTreeMap<String, String>;

/// Declared parameters that are absent or blank, in declaration order.
pub fn missing_parameters(job: &JobConfig, params: &JobParameters) -> Vec<&'static str> {
    job.parameters
        .iter()
        .copied()
        .filter(|name| params.get(*name).map_or(true, |v| v.trim().is_empty()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValidation {
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Trimmed, non-blank parameters.
    pub validated_parameters: JobParameters,
}

/// Check a parameter set before triggering. Errors block the trigger,
/// warnings do not.
pub fn validate_parameters(job: &JobConfig, params: &JobParameters) -> ParameterValidation {
    let mut errors: Vec<String> = missing_parameters(job, params)
        .into_iter()
        .map(|name| format!("Missing required parameter: {name}"))
        .collect();
    let mut warnings = Vec::new();

    if job.job_type == JOB_FRAUD_STORY_PREDICTION {
        if let Some(email) = params.get(PARAM_EMAIL_ID).map(|e| e.trim()).filter(|e| !e.is_empty()) {
            if !email.validate_email() {
                errors.push("Invalid email format".to_string());
            } else if !USUAL_EMAIL_SUFFIXES
                .iter()
                .any(|suffix| email.to_ascii_lowercase().ends_with(suffix))
            {
                warnings.push("Email domain seems unusual".to_string());
            }
        }

        if let Some(release) = params
            .get(PARAM_ENTERPRISE_RELEASE)
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
        {
            let core: String = release.chars().filter(|c| !matches!(c, '.' | '-' | '_')).collect();
            if core.is_empty() || !core.chars().all(char::is_alphanumeric) {
                warnings.push("Enterprise release format seems unusual".to_string());
            }
        }
    }

    ParameterValidation {
        success: errors.is_empty(),
        errors,
        warnings,
        validated_parameters: params
            .iter()
            .map(|(k, v)| (k.clone(), v.trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect(),
    }
}

/// Form fields sent to `buildWithParameters`: the declared parameters plus
/// `triggered_at` and `triggered_by`.
pub fn trigger_form(
    job: &JobConfig,
    params: &JobParameters,
    triggered_at: DateTime<Utc>,
) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = job
        .parameters
        .iter()
        .map(|name| {
            let value = params.get(*name).map(|v| v.trim().to_string()).unwrap_or_default();
            (name.to_string(), value)
        })
        .collect();
    form.push(("triggered_at".to_string(), triggered_at.to_rfc3339()));
    form.push(("triggered_by".to_string(), TRIGGERED_BY.to_string()));
    form
}

/// Hints shown to the user after a successful trigger.
pub fn next_steps(job: &JobConfig, params: &JobParameters) -> Vec<String> {
    let email = params
        .get(PARAM_EMAIL_ID)
        .map(String::as_str)
        .unwrap_or("specified email");
    vec![
        "Job execution started in Jenkins".to_string(),
        format!("Results will be sent to: {email}"),
        format!("Expected completion: {}", job.estimated_runtime),
        "You can check Jenkins console for real-time progress".to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Jenkins JSON shaping
// ---------------------------------------------------------------------------

fn build_number(job_json: &Value, key: &str) -> Option<i64> {
    job_json.get(key)?.get("number")?.as_i64()
}

/// The interesting part of `/job/{name}/api/json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsJobSummary {
    pub display_name: Option<String>,
    pub buildable: bool,
    pub last_build: Option<i64>,
    pub next_build_number: Option<i64>,
    pub last_successful_build: Option<i64>,
    pub last_failed_build: Option<i64>,
}

impl JenkinsJobSummary {
    pub fn from_json(job_json: &Value) -> Self {
        Self {
            display_name: job_json
                .get("displayName")
                .and_then(Value::as_str)
                .map(str::to_string),
            buildable: job_json.get("buildable").and_then(Value::as_bool).unwrap_or(false),
            last_build: build_number(job_json, "lastBuild"),
            next_build_number: job_json.get("nextBuildNumber").and_then(Value::as_i64),
            last_successful_build: build_number(job_json, "lastSuccessfulBuild"),
            last_failed_build: build_number(job_json, "lastFailedBuild"),
        }
    }
}

/// Name → value pairs from the build's `ParametersAction`.
pub fn extract_build_parameters(build_json: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    let Some(actions) = build_json.get("actions").and_then(Value::as_array) else {
        return out;
    };
    for action in actions {
        if action.get("_class").and_then(Value::as_str) != Some(PARAMETERS_ACTION_CLASS) {
            continue;
        }
        let params = action.get("parameters").and_then(Value::as_array);
        for param in params.into_iter().flatten() {
            if let (Some(name), Some(value)) = (param.get("name").and_then(Value::as_str), param.get("value")) {
                out.insert(name.to_string(), value.clone());
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildStatus {
    pub success: bool,
    pub job_type: String,
    pub job_name: String,
    pub build_number: u64,
    /// `running` while building, `completed` after.
    pub status: &'static str,
    pub result: Option<String>,
    pub building: bool,
    pub duration: i64,
    pub estimated_duration: i64,
    pub timestamp: Option<i64>,
    pub url: Option<String>,
    pub description: String,
    pub parameters: Map<String, Value>,
}

impl BuildStatus {
    pub fn from_json(job: &JobConfig, build_number: u64, build_json: &Value) -> Self {
        let building = build_json.get("building").and_then(Value::as_bool).unwrap_or(false);
        Self {
            success: true,
            job_type: job.job_type.to_string(),
            job_name: job.job_name.to_string(),
            build_number,
            status: if building { "running" } else { "completed" },
            result: build_json.get("result").and_then(Value::as_str).map(str::to_string),
            building,
            duration: build_json.get("duration").and_then(Value::as_i64).unwrap_or(0),
            estimated_duration: build_json
                .get("estimatedDuration")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            timestamp: build_json.get("timestamp").and_then(Value::as_i64),
            url: build_json.get("url").and_then(Value::as_str).map(str::to_string),
            description: build_json
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            parameters: extract_build_parameters(build_json),
        }
    }
}

/// State of a queue item (`/queue/item/{id}/api/json`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    pub success: bool,
    /// `waiting`, `cancelled` or `started`.
    pub status: &'static str,
    pub why: Option<String>,
    pub cancelled: bool,
    pub build_number: Option<i64>,
    pub build_url: Option<String>,
}

impl QueueStatus {
    pub fn from_json(item: &Value) -> Self {
        let cancelled = item.get("cancelled").and_then(Value::as_bool).unwrap_or(false);
        let executable = item.get("executable").filter(|v| !v.is_null());
        let build_number = executable.and_then(|e| e.get("number")).and_then(Value::as_i64);
        let status = if cancelled {
            "cancelled"
        } else if build_number.is_some() {
            "started"
        } else {
            "waiting"
        };
        Self {
            success: true,
            status,
            why: item.get("why").and_then(Value::as_str).map(str::to_string),
            cancelled,
            build_number,
            build_url: executable
                .and_then(|e| e.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}
