//! JWT claims preview over tokens found in a session's logs.
//!
//! Tokens are decoded without signature verification; every result carries
//! the `trust_bearing: false` label from [`beacon_core::jwt_inspect`].

use std::sync::Arc;

use beacon_core::jwt_inspect::{analyze_tokens, extract_tokens, JwtAnalysis};
use beacon_core::log_query::{LogEntry, SearchFilters};
use chrono::Utc;
use serde::Serialize;

use super::logs::LogService;

#[derive(Debug, Clone, Serialize)]
pub struct JwtReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Log types whose search succeeded.
    pub log_types_searched: Vec<String>,
    pub search_errors: Vec<String>,
    pub analysis: JwtAnalysis,
}

pub struct JwtService {
    logs: Option<Arc<LogService>>,
}

/// Texts of an entry tokens are looked for in.
fn entry_texts(entry: &LogEntry) -> Vec<String> {
    let mut texts = vec![entry.message.clone()];
    if !entry.raw_data.is_empty() {
        texts.push(serde_json::Value::Object(entry.raw_data.clone()).to_string());
    }
    texts
}

impl JwtService {
    pub fn new(logs: Option<Arc<LogService>>) -> Self {
        Self { logs }
    }

    /// Tokens supplied by the caller.
    pub fn inspect(&self, tokens: &[String]) -> JwtReport {
        let tokens = extract_tokens(tokens.iter().map(String::as_str));
        JwtReport {
            success: true,
            session_id: None,
            log_types_searched: Vec::new(),
            search_errors: Vec::new(),
            analysis: analyze_tokens(&tokens, Utc::now().timestamp()),
        }
    }

    /// Tokens found in the session's logs across `log_types` (every
    /// configured type when empty). Returns `None` without a log service.
    pub async fn inspect_session(&self, session_id: &str, log_types: &[String]) -> Option<JwtReport> {
        let logs = self.logs.as_ref()?;
        let log_types: Vec<String> = if log_types.is_empty() {
            logs.log_types().keys().cloned().collect()
        } else {
            log_types.to_vec()
        };

        let filters = SearchFilters {
            time_range: Some(beacon_core::fraud::SESSION_TIME_RANGE.to_string()),
            max_results: Some(beacon_core::fraud::SESSION_MAX_RESULTS),
            ..SearchFilters::default()
        };

        let mut texts = Vec::new();
        let mut searched = Vec::new();
        let mut errors = Vec::new();
        for log_type in &log_types {
            match logs.fetch(log_type, session_id, &filters).await {
                Ok(result) => {
                    texts.extend(result.results.iter().flat_map(entry_texts));
                    searched.push(log_type.clone());
                }
                Err(e) => {
                    tracing::warn!(%session_id, %log_type, error = %e, "Token search skipped log type");
                    errors.push(format!("{log_type}: {e}"));
                }
            }
        }

        let tokens = extract_tokens(texts.iter().map(String::as_str));
        tracing::info!(%session_id, tokens = tokens.len(), "Collected session tokens");

        Some(JwtReport {
            success: !searched.is_empty(),
            session_id: Some(session_id.to_string()),
            log_types_searched: searched,
            search_errors: errors,
            analysis: analyze_tokens(&tokens, Utc::now().timestamp()),
        })
    }
}
