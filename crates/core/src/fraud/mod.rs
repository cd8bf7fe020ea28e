//! Fraud session analysis: classification, call monitoring and risk scoring.
//!
//! The API layer gathers a session's logs from Elasticsearch and performs
//! any LLM calls; everything here is deterministic and works on the
//! gathered [`SessionLogs`].

pub mod catalog;
pub mod classify;
pub mod monitoring;
pub mod risk;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::log_query::{
    LogEntry, LOG_TYPE_API_GATEWAY, LOG_TYPE_FRAUD_DETECTION, LOG_TYPE_FULL_AUTH,
    LOG_TYPE_PAYMENT_GATEWAY,
};

pub use catalog::{fraud_type_catalog, FraudType, FraudTypeInfo};
pub use classify::{CustomerClassification, OrderClassification};
pub use monitoring::{ApiCallAnalysis, MonitoringAnalysis, SessionInsights};
pub use risk::{RiskAssessment, RiskLevel, TimelineEvent};

/// Look-back window used when gathering a session's logs.
pub const SESSION_TIME_RANGE: &str = "7d";

/// Maximum hits fetched per log type.
pub const SESSION_MAX_RESULTS: u32 = 500;

/// Log types a fraud session is gathered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    ApiGateway,
    FraudDetection,
    PaymentGateway,
    FullAuth,
}

impl LogSource {
    /// In the order gathered sources are combined.
    pub const ALL: [LogSource; 4] = [
        Self::ApiGateway,
        Self::FraudDetection,
        Self::PaymentGateway,
        Self::FullAuth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiGateway => "api_gateway",
            Self::FraudDetection => "fraud_detection",
            Self::PaymentGateway => "payment_gateway",
            Self::FullAuth => "full_auth",
        }
    }

    /// Elasticsearch log type key.
    pub fn log_type(&self) -> &'static str {
        match self {
            Self::ApiGateway => LOG_TYPE_API_GATEWAY,
            Self::FraudDetection => LOG_TYPE_FRAUD_DETECTION,
            Self::PaymentGateway => LOG_TYPE_PAYMENT_GATEWAY,
            Self::FullAuth => LOG_TYPE_FULL_AUTH,
        }
    }
}

/// All log entries gathered for one session, grouped by source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLogs {
    sources: Vec<(LogSource, Vec<LogEntry>)>,
}

impl SessionLogs {
    pub fn from_sources(sources: Vec<(LogSource, Vec<LogEntry>)>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: LogSource, entries: Vec<LogEntry>) {
        self.sources.push((source, entries));
    }

    /// Entries in gathering order, tagged with their source.
    pub fn entries(&self) -> impl Iterator<Item = (LogSource, &LogEntry)> {
        self.sources
            .iter()
            .flat_map(|(source, entries)| entries.iter().map(move |e| (*source, e)))
    }

    pub fn total(&self) -> usize {
        self.sources.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Entries across sources sorted by timestamp (missing sorts first).
    /// The sort is stable so entries with equal timestamps keep source order.
    pub fn chronological(&self) -> Vec<(LogSource, &LogEntry)> {
        let mut combined: Vec<_> = LogSource::ALL
            .iter()
            .flat_map(|wanted| {
                self.sources
                    .iter()
                    .filter(move |(source, _)| source == wanted)
                    .flat_map(|(source, entries)| entries.iter().map(move |e| (*source, e)))
            })
            .collect();
        combined.sort_by(|a, b| {
            a.1.timestamp
                .as_deref()
                .unwrap_or("")
                .cmp(b.1.timestamp.as_deref().unwrap_or(""))
        });
        combined
    }
}

/// Counts shown at the top of a fraud report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStatistics {
    pub total_logs_analyzed: usize,
    pub fraud_calls_triggered: usize,
    pub fraud_call_success_rate: f64,
    pub risk_scores_recorded: usize,
    pub decisions_made: usize,
}

/// Full result of a fraud session analysis.
#[derive(Debug, Clone, Serialize)]
pub struct FraudAnalysis {
    pub session_id: String,
    pub fraud_type: FraudType,
    pub order_classification: OrderClassification,
    pub customer_type: CustomerClassification,
    pub monitoring_analysis: MonitoringAnalysis,
    pub risk_assessment: RiskAssessment,
    pub recommendations: Vec<String>,
    pub statistics: AnalysisStatistics,
    pub timeline: Vec<TimelineEvent>,
}

/// Response envelope of `/api/fraud-analysis`.
#[derive(Debug, Clone, Serialize)]
pub struct FraudAnalysisReport {
    pub success: bool,
    pub session_id: String,
    pub fraud_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<FraudAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl FraudAnalysisReport {
    pub fn completed(analysis: FraudAnalysis) -> Self {
        Self {
            success: true,
            session_id: analysis.session_id.clone(),
            fraud_type: analysis.fraud_type.as_str().to_string(),
            analysis: Some(analysis),
            error: None,
            analyzed_at: Utc::now(),
        }
    }

    pub fn failed(session_id: &str, fraud_type: &str, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            session_id: session_id.to_string(),
            fraud_type: fraud_type.to_string(),
            analysis: None,
            error: Some(format!("Fraud analysis failed: {error}")),
            analyzed_at: Utc::now(),
        }
    }
}

/// Combine classification, monitoring results and risk scoring into the
/// final analysis.
pub fn build_analysis(
    session_id: &str,
    fraud_type: FraudType,
    logs: &SessionLogs,
    monitoring: MonitoringAnalysis,
) -> FraudAnalysis {
    let order_classification = classify::classify_order_type(logs);
    let customer_type = classify::determine_customer_type(logs);
    let risk_assessment = risk::calculate_risk_level(&monitoring, &customer_type, fraud_type);
    let recommendations = risk::generate_recommendations(
        fraud_type,
        &order_classification,
        &customer_type,
        &monitoring,
        &risk_assessment,
    );
    let statistics = AnalysisStatistics {
        total_logs_analyzed: logs.total(),
        fraud_calls_triggered: monitoring.call_sequence.len(),
        fraud_call_success_rate: monitoring.success_rate,
        risk_scores_recorded: monitoring.risk_scores.len(),
        decisions_made: monitoring.decisions.len(),
    };
    let timeline = risk::create_timeline(&monitoring);

    FraudAnalysis {
        session_id: session_id.to_string(),
        fraud_type,
        order_classification,
        customer_type,
        monitoring_analysis: monitoring,
        risk_assessment,
        recommendations,
        statistics,
        timeline,
    }
}

/// First `max` characters of `text`, with `...` appended when cut.
pub(crate) fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// First `max` characters of `text`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::entry_at;
    use super::*;

    #[test]
    fn chronological_merges_sources_by_timestamp() {
        let logs = SessionLogs::from_sources(vec![
            (LogSource::FullAuth, vec![entry_at("2024-05-01T10:00:02Z", "INFO", "auth")]),
            (LogSource::ApiGateway, vec![entry_at("2024-05-01T10:00:03Z", "INFO", "api")]),
            (LogSource::FraudDetection, vec![entry_at("2024-05-01T10:00:01Z", "INFO", "risk")]),
        ]);

        let messages: Vec<_> = logs
            .chronological()
            .into_iter()
            .map(|(_, e)| e.message.as_str())
            .collect();

        assert_eq!(messages, vec!["risk", "auth", "api"]);
        assert_eq!(logs.total(), 3);
    }

    #[test]
    fn build_analysis_on_empty_session() {
        let logs = SessionLogs::default();
        let monitoring = MonitoringAnalysis::empty();

        let analysis = build_analysis("S-1", FraudType::TransactionFraud, &logs, monitoring);

        assert_eq!(analysis.statistics.total_logs_analyzed, 0);
        assert_eq!(analysis.order_classification.order_type, "unknown");
        assert_eq!(analysis.risk_assessment.level, RiskLevel::Minimal);
        assert!(analysis.timeline.is_empty());
    }

    #[test]
    fn failed_report_carries_prefix() {
        let report = FraudAnalysisReport::failed("S-1", "digital_fraud", "boom");
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("Fraud analysis failed: boom"));
    }

    #[test]
    fn truncation_helpers() {
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("abc", 3), "abc");
        assert_eq!(truncate("abcdef", 2), "ab");
    }
}
