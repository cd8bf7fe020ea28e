//! Fraud session analysis: gather the session's logs, analyse every entry
//! as a monitoring call and score the session.

use std::sync::Arc;
use std::time::Duration;

use beacon_connectors::llm::ChatModel;
use beacon_core::fraud::catalog::FraudType;
use beacon_core::fraud::monitoring::{
    ai_analysis, heuristic_analysis, insights_call_summary, summarize, ApiCallAnalysis,
    SessionInsights,
};
use beacon_core::fraud::{
    build_analysis, FraudAnalysisReport, LogSource, SessionLogs, SESSION_MAX_RESULTS,
    SESSION_TIME_RANGE,
};
use beacon_core::log_query::{LogEntry, SearchFilters};
use beacon_core::prompts::{
    api_call_prompt, log_context, session_insights_prompt, API_CALL_PARAMS,
    SESSION_INSIGHTS_PARAMS,
};
use tokio::time::{timeout, Instant};

use super::logs::LogService;

const NO_MODEL_NOTE: &str = "AI analysis unavailable: no model configured";
const CAP_REACHED_NOTE: &str = "AI analysis skipped: per-session limit reached";
const TIME_BUDGET_NOTE: &str = "AI analysis skipped: per-session time budget spent";

/// Stand-in deadline when the configured budget overflows the clock.
const UNBOUNDED_BUDGET: Duration = Duration::from_secs(86_400 * 365);

/// Limits on the per-entry model calls of one session analysis.
#[derive(Debug, Clone, Copy)]
pub struct AiBudget {
    pub max_calls: usize,
    /// Wall time shared by all per-entry calls. An in-flight call is cut off
    /// when it runs out.
    pub max_time: Duration,
}

pub struct FraudService {
    logs: Arc<LogService>,
    llm: Option<Arc<dyn ChatModel>>,
    budget: AiBudget,
}

impl FraudService {
    pub fn new(logs: Arc<LogService>, llm: Option<Arc<dyn ChatModel>>, budget: AiBudget) -> Self {
        Self { logs, llm, budget }
    }

    /// Session logs of one source. A failed search is logged and counts as
    /// no logs.
    async fn fetch_source(&self, session_id: &str, source: LogSource) -> Result<Vec<LogEntry>, String> {
        let filters = SearchFilters {
            time_range: Some(SESSION_TIME_RANGE.to_string()),
            max_results: Some(SESSION_MAX_RESULTS),
            ..SearchFilters::default()
        };
        match self.logs.fetch(source.log_type(), session_id, &filters).await {
            Ok(result) => {
                tracing::info!(
                    %session_id,
                    source = source.as_str(),
                    count = result.results.len(),
                    "Gathered session logs"
                );
                Ok(result.results)
            }
            Err(e) => {
                tracing::warn!(%session_id, source = source.as_str(), error = %e, "Log source unavailable");
                Err(format!("{}: {e}", source.log_type()))
            }
        }
    }

    async fn gather_session_logs(&self, session_id: &str) -> (SessionLogs, Vec<String>) {
        let [a, b, c, d] = LogSource::ALL;
        let results = tokio::join!(
            self.fetch_source(session_id, a),
            self.fetch_source(session_id, b),
            self.fetch_source(session_id, c),
            self.fetch_source(session_id, d),
        );

        let mut logs = SessionLogs::default();
        let mut errors = Vec::new();
        for (source, result) in [(a, results.0), (b, results.1), (c, results.2), (d, results.3)] {
            match result {
                Ok(entries) => logs.push(source, entries),
                Err(e) => errors.push(e),
            }
        }
        (logs, errors)
    }

    async fn analyse_entry(
        &self,
        index: usize,
        deadline: Instant,
        fraud_type: FraudType,
        source: LogSource,
        entry: &LogEntry,
    ) -> ApiCallAnalysis {
        let Some(llm) = &self.llm else {
            return heuristic_analysis(entry, source, NO_MODEL_NOTE);
        };
        if index >= self.budget.max_calls {
            return heuristic_analysis(entry, source, CAP_REACHED_NOTE);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return heuristic_analysis(entry, source, TIME_BUDGET_NOTE);
        }

        let prompt = api_call_prompt(fraud_type.as_str(), &log_context(entry, source.as_str()));
        match timeout(remaining, llm.complete(&prompt, API_CALL_PARAMS)).await {
            Ok(Ok(reply)) => ai_analysis(entry, source, &reply),
            Ok(Err(e)) => {
                tracing::warn!(entry_id = ?entry.id, error = %e, "Entry analysis call failed");
                heuristic_analysis(entry, source, &format!("AI analysis failed: {e}"))
            }
            Err(_) => {
                tracing::warn!(entry_id = ?entry.id, "Entry analysis cut off by the session time budget");
                heuristic_analysis(entry, source, TIME_BUDGET_NOTE)
            }
        }
    }

    async fn session_insights(&self, fraud_type: FraudType, analyses: &[ApiCallAnalysis]) -> SessionInsights {
        let Some(llm) = &self.llm else {
            return SessionInsights::default();
        };
        if analyses.is_empty() {
            return SessionInsights::default();
        }

        let prompt = session_insights_prompt(fraud_type.as_str(), &insights_call_summary(analyses));
        match llm.complete(&prompt, SESSION_INSIGHTS_PARAMS).await {
            Ok(reply) => SessionInsights::from_reply(&reply).unwrap_or_else(|| {
                tracing::warn!("Session insights reply was not JSON, using fallback");
                SessionInsights::default()
            }),
            Err(e) => {
                tracing::error!(error = %e, "Session insights call failed");
                SessionInsights::default()
            }
        }
    }

    pub async fn analyze_session(&self, session_id: &str, fraud_type: FraudType) -> FraudAnalysisReport {
        tracing::info!(%session_id, fraud_type = fraud_type.as_str(), "Starting fraud analysis");

        let (logs, errors) = self.gather_session_logs(session_id).await;
        if errors.len() == LogSource::ALL.len() {
            return FraudAnalysisReport::failed(
                session_id,
                fraud_type.as_str(),
                format!("no log source could be searched ({})", errors.join("; ")),
            );
        }

        let entries = logs.chronological();
        let mut analyses = Vec::with_capacity(entries.len());
        let deadline = Instant::now()
            .checked_add(self.budget.max_time)
            .unwrap_or_else(|| Instant::now() + UNBOUNDED_BUDGET);
        // Sequential so the per-session model budget is spent in time order.
        for (index, (source, entry)) in entries.iter().enumerate() {
            analyses.push(self.analyse_entry(index, deadline, fraud_type, *source, entry).await);
        }

        let insights = self.session_insights(fraud_type, &analyses).await;
        let monitoring = summarize(&entries, analyses, insights);
        let analysis = build_analysis(session_id, fraud_type, &logs, monitoring);

        tracing::info!(
            %session_id,
            risk = analysis.risk_assessment.level.as_str(),
            score = analysis.risk_assessment.score,
            logs = analysis.statistics.total_logs_analyzed,
            "Fraud analysis finished"
        );
        FraudAnalysisReport::completed(analysis)
    }
}
