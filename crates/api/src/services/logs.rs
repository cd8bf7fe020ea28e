//! Session log search over Elasticsearch.

use std::collections::BTreeMap;
use std::sync::Arc;

use beacon_connectors::elasticsearch::{ElasticsearchError, LogSearch};
use beacon_core::error::CoreError;
use beacon_core::log_query::{
    build_search_query, components_aggregation_query, format_search_response,
    parse_component_buckets, LogEntry, LogTypeConfig, SearchFilters,
};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum LogFetchError {
    #[error(transparent)]
    Input(#[from] CoreError),

    #[error(transparent)]
    Search(#[from] ElasticsearchError),
}

/// Formatted hits of one search.
#[derive(Debug, Clone, Serialize)]
pub struct LogSearchResult {
    pub success: bool,
    pub log_type: String,
    pub session_id: String,
    pub total_hits: u64,
    pub results: Vec<LogEntry>,
    pub filters_applied: SearchFilters,
    pub index_searched: String,
    pub search_time_ms: u64,
}

pub struct LogService {
    search: Arc<dyn LogSearch>,
    log_types: BTreeMap<String, LogTypeConfig>,
}

impl LogService {
    pub fn new(search: Arc<dyn LogSearch>, log_types: BTreeMap<String, LogTypeConfig>) -> Self {
        Self { search, log_types }
    }

    pub fn log_types(&self) -> &BTreeMap<String, LogTypeConfig> {
        &self.log_types
    }

    pub fn config(&self, log_type: &str) -> Result<&LogTypeConfig, CoreError> {
        self.log_types
            .get(log_type)
            .ok_or_else(|| CoreError::Validation(format!("Unknown log type: {log_type}")))
    }

    /// Run one session search against the log type's index.
    pub async fn fetch(
        &self,
        log_type: &str,
        session_id: &str,
        filters: &SearchFilters,
    ) -> Result<LogSearchResult, LogFetchError> {
        let config = self.config(log_type)?;
        let query = build_search_query(session_id, config, filters);
        let response = self.search.search(&config.index, &query).await?;
        let hits = format_search_response(&response, log_type, session_id);

        tracing::info!(
            %log_type,
            %session_id,
            total = hits.total,
            returned = hits.logs.len(),
            "Log search finished"
        );

        Ok(LogSearchResult {
            success: true,
            log_type: log_type.to_string(),
            session_id: session_id.to_string(),
            total_hits: hits.total,
            results: hits.logs,
            filters_applied: filters.clone(),
            index_searched: config.index.clone(),
            search_time_ms: response.get("took").and_then(Value::as_u64).unwrap_or(0),
        })
    }

    /// Response body of `/api/search-logs`. An unknown log type is an input
    /// error; a failed search is reported in the body.
    pub async fn search_response(
        &self,
        log_type: &str,
        session_id: &str,
        filters: &SearchFilters,
    ) -> Result<Value, CoreError> {
        match self.fetch(log_type, session_id, filters).await {
            Ok(result) => Ok(serde_json::to_value(result)
                .map_err(|e| CoreError::Internal(e.to_string()))?),
            Err(LogFetchError::Input(e)) => Err(e),
            Err(LogFetchError::Search(e)) => {
                tracing::error!(%log_type, %session_id, error = %e, "Log search failed");
                Ok(json!({ "success": false, "error": format!("Search failed: {e}") }))
            }
        }
    }

    /// Distinct component names of a log type (top 50).
    pub async fn components(&self, log_type: &str) -> Result<Value, CoreError> {
        let config = self.config(log_type)?;
        let query = components_aggregation_query(config);
        match self.search.search(&config.index, &query).await {
            Ok(response) => Ok(json!({
                "success": true,
                "log_type": log_type,
                "components": parse_component_buckets(&response),
            })),
            Err(e) => {
                tracing::error!(%log_type, error = %e, "Component aggregation failed");
                Ok(json!({
                    "success": false,
                    "log_type": log_type,
                    "components": [],
                    "error": e.to_string(),
                }))
            }
        }
    }

    pub async fn probe(&self) -> Value {
        match self.search.probe().await {
            Ok(info) => {
                let mut body = json!({
                    "success": true,
                    "message": "Elasticsearch connection successful",
                });
                if let (Some(obj), Ok(Value::Object(fields))) = (body.as_object_mut(), serde_json::to_value(info)) {
                    obj.extend(fields);
                }
                body
            }
            Err(e) => json!({
                "success": false,
                "error": format!("Connection failed: {e}"),
            }),
        }
    }
}
