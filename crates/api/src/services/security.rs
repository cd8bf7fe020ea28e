//! Fraud & security impact analysis of a Jira issue.

use std::sync::Arc;

use beacon_connectors::jira::JiraClient;
use beacon_connectors::llm::ChatModel;
use beacon_core::llm_json::extract_json_object;
use beacon_core::prompts::{issue_security_context, security_analysis_prompt, SECURITY_ANALYSIS_PARAMS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Risk level assumed when the model answers in prose.
const UNPARSED_RISK_LEVEL: &str = "Medium";
const FAILED_RISK_LEVEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityAnalysisResult {
    pub success: bool,
    pub issue_key: String,
    pub analysis: Option<String>,
    pub risk_level: Option<String>,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `analysis`, `risk_level`, `recommendations` as answered by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityFindings {
    pub analysis: String,
    pub risk_level: String,
    pub recommendations: Vec<String>,
}

impl SecurityFindings {
    /// Read the model's JSON answer; prose is kept whole as the analysis.
    pub fn from_reply(reply: &str) -> Self {
        let Some(Value::Object(obj)) = extract_json_object(reply) else {
            return Self {
                analysis: reply.to_string(),
                risk_level: UNPARSED_RISK_LEVEL.to_string(),
                recommendations: vec![
                    "Review the detailed analysis above for specific recommendations".to_string(),
                ],
            };
        };

        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let recommendations = match obj.get("recommendations") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        };

        Self {
            analysis: text("analysis").unwrap_or_else(|| reply.to_string()),
            risk_level: text("risk_level").unwrap_or_else(|| UNPARSED_RISK_LEVEL.to_string()),
            recommendations,
        }
    }

    /// Stand-in when the model could not be reached.
    pub fn unavailable(error: impl std::fmt::Display) -> Self {
        Self {
            analysis: format!("Unable to generate security analysis. Error: {error}"),
            risk_level: FAILED_RISK_LEVEL.to_string(),
            recommendations: vec!["Manual security review recommended".to_string()],
        }
    }
}

pub struct SecurityService {
    jira: Arc<JiraClient>,
    llm: Arc<dyn ChatModel>,
}

impl SecurityService {
    pub fn new(jira: Arc<JiraClient>, llm: Arc<dyn ChatModel>) -> Self {
        Self { jira, llm }
    }

    pub async fn analyze_issue(&self, issue_key: &str) -> SecurityAnalysisResult {
        tracing::info!(%issue_key, "Analysing issue security impact");

        let issue = match self.jira.get_issue(issue_key).await {
            Ok(issue) => issue,
            Err(e) => {
                tracing::error!(%issue_key, error = %e, "Could not fetch issue for analysis");
                return SecurityAnalysisResult {
                    success: false,
                    issue_key: issue_key.to_string(),
                    analysis: None,
                    risk_level: None,
                    recommendations: Vec::new(),
                    analyzed_at: Utc::now(),
                    error: Some(format!("Issue {issue_key} not found or inaccessible: {e}")),
                };
            }
        };

        let prompt = security_analysis_prompt(&issue_security_context(&issue));
        let findings = match self.llm.complete(&prompt, SECURITY_ANALYSIS_PARAMS).await {
            Ok(reply) => SecurityFindings::from_reply(&reply),
            Err(e) => {
                tracing::error!(%issue_key, error = %e, "Security analysis call failed");
                SecurityFindings::unavailable(e)
            }
        };

        SecurityAnalysisResult {
            success: true,
            issue_key: issue_key.to_string(),
            analysis: Some(findings.analysis),
            risk_level: Some(findings.risk_level),
            recommendations: findings.recommendations,
            analyzed_at: Utc::now(),
            error: None,
        }
    }
}
