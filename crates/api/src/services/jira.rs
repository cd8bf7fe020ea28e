//! Natural-language Jira search and issue lookup.

use std::sync::Arc;

use beacon_connectors::jira::JiraClient;
use beacon_connectors::llm::ChatModel;
use beacon_core::jql::{build_jql, JiraQuery};
use beacon_core::llm_json::extract_json_object;
use beacon_core::prompts::{jira_parse_prompt, JIRA_PARSE_PARAMS};
use serde_json::{json, Value};

pub struct JiraService {
    jira: Arc<JiraClient>,
    llm: Option<Arc<dyn ChatModel>>,
}

impl JiraService {
    pub fn new(jira: Arc<JiraClient>, llm: Option<Arc<dyn ChatModel>>) -> Self {
        Self { jira, llm }
    }

    /// Ask the model for structured filters. Any failure (no model, call
    /// error, unparseable answer) yields a keyword search over the raw words.
    pub async fn parse_query(&self, user_query: &str) -> JiraQuery {
        let Some(llm) = &self.llm else {
            return JiraQuery::keyword_fallback(user_query);
        };

        let reply = match llm.complete(&jira_parse_prompt(user_query), JIRA_PARSE_PARAMS).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "Query parsing call failed, using keyword search");
                return JiraQuery::keyword_fallback(user_query);
            }
        };

        match extract_json_object(&reply).map(JiraQuery::from_llm_value) {
            Some(Ok(query)) => query,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Unusable query fields from model, using keyword search");
                JiraQuery::keyword_fallback(user_query)
            }
            None => {
                tracing::warn!("Model reply had no JSON object, using keyword search");
                JiraQuery::keyword_fallback(user_query)
            }
        }
    }

    /// Parse, render JQL and search.
    pub async fn process_query(&self, user_query: &str, max_results: u32) -> Value {
        tracing::info!(%user_query, "Processing Jira query");
        let parsed = self.parse_query(user_query).await;
        let jql = build_jql(&parsed);
        tracing::info!(%jql, query_type = parsed.query_type.as_str(), "Built JQL");

        match self.jira.search(&jql, max_results).await {
            Ok(data) => json!({
                "success": true,
                "data": data,
                "jql_query": jql,
                "parsed_query": parsed,
            }),
            Err(e) => {
                tracing::error!(error = %e, "Jira search failed");
                json!({
                    "success": false,
                    "error": format!("Failed to query Jira: {e}"),
                    "jql_query": jql,
                })
            }
        }
    }

    pub async fn issue(&self, issue_key: &str) -> Value {
        match self.jira.get_issue(issue_key).await {
            Ok(issue) => json!({ "success": true, "issue": issue }),
            Err(e) => {
                tracing::error!(%issue_key, error = %e, "Jira issue fetch failed");
                json!({
                    "success": false,
                    "error": format!("Failed to fetch issue {issue_key}: {e}"),
                })
            }
        }
    }

    pub async fn probe(&self) -> Value {
        match self.jira.probe().await {
            Ok(total) => json!({
                "success": true,
                "message": "Jira connection successful",
                "total_issues": total,
            }),
            Err(e) => json!({
                "success": false,
                "error": format!("Jira connection failed: {e}"),
            }),
        }
    }
}
