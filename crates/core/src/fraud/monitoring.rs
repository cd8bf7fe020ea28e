//! Per-call analysis of a session's log lines.
//!
//! Each log entry is treated as one API call. The API layer asks the LLM for
//! an [`ApiCallAnalysis`] up to a configured number of entries and uses
//! [`heuristic_analysis`] for the rest; [`summarize`] then folds the results
//! into a [`MonitoringAnalysis`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{truncate, LogSource};
use crate::llm_json::{extract_json_object, extract_typed};
use crate::log_query::LogEntry;

/// Fraud monitoring call categories and the call names logged for them.
pub const FRAUD_MONITORING_CALLS: &[(&str, &[&str])] = &[
    ("customer_verification", &["customer_lookup", "identity_check", "kyc_validation"]),
    ("transaction_monitoring", &["velocity_check", "amount_validation", "pattern_analysis"]),
    ("device_fingerprinting", &["device_check", "browser_analysis", "ip_validation"]),
    ("behavioral_analysis", &["user_behavior", "session_analysis", "interaction_patterns"]),
    ("risk_scoring", &["risk_calculator", "ml_scoring", "rule_engine"]),
    ("external_checks", &["blacklist_check", "whitelist_validation", "bureau_check"]),
];

const FAILURE_WORDS: &[&str] = &["error", "failed", "timeout", "exception", "denied", "rejected"];
const SUCCESS_WORDS: &[&str] = &["success", "completed", "approved", "validated", "passed"];
const APPROVING_DECISIONS: &[&str] = &["APPROVE", "ACCEPT", "PASS"];
const BLOCKING_DECISIONS: &[&str] = &["DENY", "REJECT", "FAIL", "BLOCK"];

/// Confidence given to analyses not produced by the model.
const HEURISTIC_CONFIDENCE: f64 = 0.3;

/// Error buckets, checked in order; the first matching bucket wins.
const ERROR_BUCKETS: &[(&str, &[&str])] = &[
    ("authorization_errors", &["authorization", "permission", "forbidden", "access"]),
    ("authentication_errors", &["auth", "login", "credential", "token"]),
    ("timeout_errors", &["timeout", "slow", "delay"]),
    ("validation_errors", &["validation", "invalid", "format", "required"]),
    ("system_errors", &["system", "internal", "server", "database"]),
    ("network_errors", &["network", "connection", "unreachable"]),
    ("business_logic_errors", &["business", "rule", "policy", "limit"]),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Ai,
    Heuristic,
}

/// Assessment of one log entry seen as an API call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiCallAnalysis {
    pub api_endpoint: String,
    pub http_method: String,
    pub request_purpose: String,
    pub response_analysis: String,
    pub is_successful: bool,
    pub error_details: Option<String>,
    pub fraud_relevance: String,
    pub risk_indicators: Vec<String>,
    pub business_impact: String,
    pub recommendations: String,
    pub processing_time_ms: Option<Value>,
    pub status_code: Option<Value>,
    pub confidence_score: f64,
    pub timestamp: Option<String>,
    pub log_level: String,
    pub source_type: LogSource,
    pub session_id: String,
    pub original_message: String,
    pub component: String,
    pub raw_log_id: String,
    /// Fraud monitoring category the entry belongs to, if any.
    pub category: Option<String>,
    pub call_type: Option<String>,
    pub analysis_source: AnalysisSource,
}

/// One categorized fraud monitoring call, in session order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallEvent {
    pub timestamp: Option<String>,
    pub category: String,
    pub call_type: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScoreSample {
    pub timestamp: Option<String>,
    pub score: f64,
    pub source: LogSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub timestamp: Option<String>,
    pub decision: String,
    pub source: LogSource,
}

/// Session-level summary written by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInsights {
    pub overall_session_health: String,
    pub key_findings: Vec<String>,
    pub fraud_risk_assessment: String,
    pub critical_issues: Vec<String>,
    pub positive_indicators: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub session_score: f64,
    pub confidence_level: String,
}

impl Default for SessionInsights {
    /// Used when the model is unavailable or its answer cannot be parsed.
    fn default() -> Self {
        Self {
            overall_session_health: "Analysis unavailable".to_string(),
            key_findings: vec!["AI analysis failed".to_string()],
            fraud_risk_assessment: "Manual review required".to_string(),
            critical_issues: Vec::new(),
            positive_indicators: Vec::new(),
            recommended_actions: vec!["Manual review recommended".to_string()],
            session_score: 50.0,
            confidence_level: "low".to_string(),
        }
    }
}

impl SessionInsights {
    pub fn from_reply(reply: &str) -> Option<Self> {
        extract_typed(reply)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub total_api_calls: usize,
    pub successful_calls: usize,
    pub failed_calls: usize,
    pub success_rate: f64,
    pub unique_endpoints: usize,
    pub error_types: BTreeMap<String, usize>,
}

/// Everything learned from the session's calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringAnalysis {
    pub api_call_analysis: Vec<ApiCallAnalysis>,
    pub success_rate: f64,
    pub failed_calls: Vec<ApiCallAnalysis>,
    pub ai_insights: SessionInsights,
    pub summary_statistics: SummaryStatistics,
    /// Category → call types seen for it.
    pub triggered_calls: BTreeMap<String, Vec<String>>,
    pub call_sequence: Vec<CallEvent>,
    pub risk_scores: Vec<RiskScoreSample>,
    pub decisions: Vec<DecisionRecord>,
}

impl MonitoringAnalysis {
    pub fn empty() -> Self {
        Self {
            api_call_analysis: Vec::new(),
            success_rate: 0.0,
            failed_calls: Vec::new(),
            ai_insights: SessionInsights::default(),
            summary_statistics: SummaryStatistics::default(),
            triggered_calls: BTreeMap::new(),
            call_sequence: Vec::new(),
            risk_scores: Vec::new(),
            decisions: Vec::new(),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.api_call_analysis.len()
    }
}

// ---------------------------------------------------------------------------
// Per-entry analysis
// ---------------------------------------------------------------------------

/// Match an entry to a fraud monitoring call by name. Names are looked for
/// in the message, component and endpoint with `_`, `-` or a space between
/// words.
pub fn categorize_call(entry: &LogEntry) -> Option<(&'static str, &'static str)> {
    let text = format!(
        "{} {} {}",
        entry.message,
        entry.component,
        entry.detail_text("api_endpoint").unwrap_or_default()
    )
    .to_lowercase();

    FRAUD_MONITORING_CALLS.iter().find_map(|&(category, calls)| {
        calls
            .iter()
            .find(|call| {
                text.contains(**call)
                    || text.contains(&call.replace('_', "-"))
                    || text.contains(&call.replace('_', " "))
            })
            .map(|call| (category, *call))
    })
}

/// Decide from the entry alone whether the call succeeded.
pub fn determine_call_success(entry: &LogEntry) -> bool {
    let level = entry.level.to_lowercase();
    if level == "error" || level == "fatal" {
        return false;
    }

    let message = entry.message.to_lowercase();
    if FAILURE_WORDS.iter().any(|w| message.contains(w)) {
        return false;
    }
    if SUCCESS_WORDS.iter().any(|w| message.contains(w)) {
        return true;
    }

    if let Some(decision) = entry.detail_text("decision") {
        let decision = decision.to_uppercase();
        if APPROVING_DECISIONS.contains(&decision.as_str()) {
            return true;
        }
        if BLOCKING_DECISIONS.contains(&decision.as_str()) {
            return false;
        }
    }

    level == "info" || level == "debug"
}

fn base_analysis(entry: &LogEntry, source: LogSource) -> ApiCallAnalysis {
    let category = categorize_call(entry);
    let is_successful = determine_call_success(entry);
    let error_details = if is_successful {
        None
    } else if entry.message.is_empty() {
        Some("Unknown error".to_string())
    } else {
        Some(entry.message.clone())
    };

    ApiCallAnalysis {
        api_endpoint: entry
            .detail_text("api_endpoint")
            .or_else(|| (!entry.component.is_empty()).then(|| entry.component.clone()))
            .unwrap_or_else(|| "Unknown".to_string()),
        http_method: entry
            .detail_text("http_method")
            .unwrap_or_else(|| "Unknown".to_string()),
        request_purpose: "Analysis unavailable".to_string(),
        response_analysis: "No analysis available".to_string(),
        is_successful,
        error_details,
        fraud_relevance: "Requires manual review".to_string(),
        risk_indicators: Vec::new(),
        business_impact: "Unknown".to_string(),
        recommendations: "Manual review recommended".to_string(),
        processing_time_ms: entry.details.get("response_time").filter(|v| !v.is_null()).cloned(),
        status_code: entry.details.get("status_code").filter(|v| !v.is_null()).cloned(),
        confidence_score: HEURISTIC_CONFIDENCE,
        timestamp: entry.timestamp.clone(),
        log_level: entry.level.clone(),
        source_type: source,
        session_id: entry.session_id.clone(),
        original_message: truncate(&entry.message, 200),
        component: entry.component.clone(),
        raw_log_id: entry.id.clone().unwrap_or_default(),
        category: category.map(|(c, _)| c.to_string()),
        call_type: category.map(|(_, t)| t.to_string()),
        analysis_source: AnalysisSource::Heuristic,
    }
}

/// Deterministic analysis. `note` explains why the model was not used and
/// becomes the response analysis text.
pub fn heuristic_analysis(entry: &LogEntry, source: LogSource, note: &str) -> ApiCallAnalysis {
    let mut analysis = base_analysis(entry, source);
    if !note.is_empty() {
        analysis.response_analysis = truncate(note, 200);
    }
    analysis
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Some(other.to_string()),
    }
}

/// Merge the model's JSON answer over the entry's metadata. A reply without
/// a usable JSON object falls back to [`heuristic_analysis`] with the reply
/// text as the note.
pub fn ai_analysis(entry: &LogEntry, source: LogSource, reply: &str) -> ApiCallAnalysis {
    let Some(Value::Object(obj)) = extract_json_object(reply) else {
        return heuristic_analysis(entry, source, reply);
    };

    let mut analysis = base_analysis(entry, source);
    analysis.analysis_source = AnalysisSource::Ai;

    if let Some(v) = text_field(&obj, "api_endpoint") {
        analysis.api_endpoint = v;
    }
    if let Some(v) = text_field(&obj, "http_method") {
        analysis.http_method = v;
    }
    if let Some(v) = text_field(&obj, "request_purpose") {
        analysis.request_purpose = v;
    }
    if let Some(v) = text_field(&obj, "response_analysis") {
        analysis.response_analysis = v;
    }
    if let Some(v) = text_field(&obj, "fraud_relevance") {
        analysis.fraud_relevance = v;
    }
    if let Some(v) = text_field(&obj, "business_impact") {
        analysis.business_impact = v;
    }
    if let Some(v) = text_field(&obj, "recommendations") {
        analysis.recommendations = v;
    }
    if let Some(success) = obj.get("is_successful").and_then(Value::as_bool) {
        analysis.is_successful = success;
        analysis.error_details = if success {
            None
        } else {
            text_field(&obj, "error_details").or(analysis.error_details)
        };
    }
    if let Some(Value::Array(items)) = obj.get("risk_indicators") {
        analysis.risk_indicators = items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = obj.get("processing_time_ms").filter(|v| !v.is_null()) {
        analysis.processing_time_ms = Some(v.clone());
    }
    if let Some(v) = obj.get("status_code").filter(|v| !v.is_null()) {
        analysis.status_code = Some(v.clone());
    }
    if let Some(score) = obj.get("confidence_score").and_then(Value::as_f64) {
        analysis.confidence_score = score.clamp(0.0, 1.0);
    }

    analysis
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Count failed calls per error bucket; empty buckets are left out.
pub fn categorize_error_types(failed: &[ApiCallAnalysis]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for call in failed {
        let details = call.error_details.as_deref().unwrap_or_default().to_lowercase();
        let bucket = ERROR_BUCKETS
            .iter()
            .find(|(_, terms)| terms.iter().any(|t| details.contains(t)))
            .map(|(bucket, _)| *bucket)
            .unwrap_or("unknown_errors");
        *counts.entry(bucket.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Compact JSON list of the calls, embedded in the session insights prompt.
pub fn insights_call_summary(analyses: &[ApiCallAnalysis]) -> String {
    let summary: Vec<Value> = analyses
        .iter()
        .map(|a| {
            serde_json::json!({
                "endpoint": a.api_endpoint,
                "success": a.is_successful,
                "purpose": a.request_purpose,
                "fraud_relevance": a.fraud_relevance,
                "risk_indicators": a.risk_indicators,
            })
        })
        .collect();
    serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "[]".to_string())
}

/// Fold per-entry analyses into the session view. `entries` and `analyses`
/// are index-aligned.
pub fn summarize(
    entries: &[(LogSource, &LogEntry)],
    analyses: Vec<ApiCallAnalysis>,
    insights: SessionInsights,
) -> MonitoringAnalysis {
    let mut triggered_calls: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut call_sequence = Vec::new();

    for analysis in &analyses {
        let (Some(category), Some(call_type)) = (&analysis.category, &analysis.call_type) else {
            continue;
        };
        let calls = triggered_calls.entry(category.clone()).or_default();
        if !calls.contains(call_type) {
            calls.push(call_type.clone());
        }
        call_sequence.push(CallEvent {
            timestamp: analysis.timestamp.clone(),
            category: category.clone(),
            call_type: call_type.clone(),
            success: analysis.is_successful,
            message: analysis.original_message.clone(),
        });
    }

    let mut risk_scores = Vec::new();
    let mut decisions = Vec::new();
    for (source, entry) in entries {
        if let Some(score) = entry.detail_f64("risk_score") {
            risk_scores.push(RiskScoreSample {
                timestamp: entry.timestamp.clone(),
                score,
                source: *source,
            });
        }
        if let Some(decision) = entry.detail_text("decision") {
            decisions.push(DecisionRecord {
                timestamp: entry.timestamp.clone(),
                decision,
                source: *source,
            });
        }
    }

    let total = analyses.len();
    let successful = analyses.iter().filter(|a| a.is_successful).count();
    let failed_calls: Vec<ApiCallAnalysis> =
        analyses.iter().filter(|a| !a.is_successful).cloned().collect();
    let success_rate = if total > 0 {
        successful as f64 / total as f64
    } else {
        0.0
    };
    let unique_endpoints = analyses
        .iter()
        .map(|a| a.api_endpoint.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let summary_statistics = SummaryStatistics {
        total_api_calls: total,
        successful_calls: successful,
        failed_calls: failed_calls.len(),
        success_rate,
        unique_endpoints,
        error_types: categorize_error_types(&failed_calls),
    };

    MonitoringAnalysis {
        api_call_analysis: analyses,
        success_rate,
        failed_calls,
        ai_insights: insights,
        summary_statistics,
        triggered_calls,
        call_sequence,
        risk_scores,
        decisions,
    }
}
