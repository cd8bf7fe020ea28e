//! Jira Cloud REST API v3 client.
//!
//! Authenticates with HTTP basic auth (account email + API token).

use std::time::Duration;

use serde_json::{json, Value};

use crate::{error_body, http_client};

/// Fields returned for each search hit.
pub const SEARCH_FIELDS: &[&str] = &[
    "summary",
    "description",
    "status",
    "assignee",
    "reporter",
    "created",
    "updated",
    "priority",
    "issuetype",
    "project",
    "parent",
    "subtasks",
    "labels",
    "components",
];

/// Fields requested when fetching a single issue.
pub const ISSUE_FIELDS: &str =
    "summary,description,status,assignee,priority,issuetype,labels,components,reporter,created,updated";

pub const DEFAULT_MAX_RESULTS: u32 = 50;

const PROBE_JQL: &str = "project is not EMPTY ORDER BY created DESC";
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Jira API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Connection details for one Jira site.
#[derive(Debug, Clone)]
pub struct JiraCredentials {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
}

pub struct JiraClient {
    client: reqwest::Client,
    credentials: JiraCredentials,
}

impl JiraClient {
    pub fn new(mut credentials: JiraCredentials, timeout: Duration) -> Result<Self, JiraError> {
        credentials.base_url = credentials.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client: http_client(timeout, false)?,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }

    /// `POST /rest/api/3/search` with the given JQL.
    pub async fn search(&self, jql: &str, max_results: u32) -> Result<Value, JiraError> {
        let body = json!({
            "jql": jql,
            "maxResults": max_results,
            "fields": SEARCH_FIELDS,
        });
        tracing::debug!(%jql, max_results, "Searching Jira");
        let response = self
            .client
            .post(format!("{}/rest/api/3/search", self.credentials.base_url))
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /rest/api/3/issue/{key}`.
    pub async fn get_issue(&self, issue_key: &str) -> Result<Value, JiraError> {
        let response = self
            .client
            .get(format!(
                "{}/rest/api/3/issue/{}",
                self.credentials.base_url, issue_key
            ))
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
            .query(&[("fields", ISSUE_FIELDS)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// One-hit search; returns the site's total issue count.
    pub async fn probe(&self) -> Result<u64, JiraError> {
        let body = json!({
            "jql": PROBE_JQL,
            "maxResults": 1,
            "fields": ["summary", "status", "issuetype", "project"],
        });
        let response = self
            .client
            .post(format!("{}/rest/api/3/search", self.credentials.base_url))
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
            .timeout(PROBE_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let result: Value = Self::parse_response(response).await?;
        Ok(result.get("total").and_then(Value::as_u64).unwrap_or(0))
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, JiraError> {
        let status = response.status();
        if !status.is_success() {
            return Err(JiraError::Api {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use assert_matches::assert_matches;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    fn credentials(base_url: String) -> JiraCredentials {
        JiraCredentials {
            base_url: format!("{base_url}/"),
            username: "bot@example.com".into(),
            api_token: "secret".into(),
        }
    }

    #[tokio::test]
    async fn search_posts_jql_with_basic_auth() {
        let app = Router::new().route(
            "/rest/api/3/search",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers["authorization"].to_str().unwrap().to_string();
                Json(json!({ "total": 1, "auth": auth, "echo": body }))
            }),
        );
        let client = JiraClient::new(credentials(test_server::spawn(app).await), Duration::from_secs(5)).unwrap();

        let result = client.search("issuetype = Story", 50).await.unwrap();

        assert!(result["auth"].as_str().unwrap().starts_with("Basic "));
        assert_eq!(result["echo"]["jql"], "issuetype = Story");
        assert_eq!(result["echo"]["maxResults"], 50);
        assert_eq!(result["echo"]["fields"][0], "summary");
    }

    #[tokio::test]
    async fn probe_reports_total_and_api_errors() {
        let ok = Router::new().route("/rest/api/3/search", post(|| async { Json(json!({"total": 42})) }));
        let client = JiraClient::new(credentials(test_server::spawn(ok).await), Duration::from_secs(5)).unwrap();
        assert_eq!(client.probe().await.unwrap(), 42);

        let denied = Router::new().route(
            "/rest/api/3/issue/{key}",
            get(|| async { (StatusCode::UNAUTHORIZED, "bad token") }),
        );
        let client = JiraClient::new(credentials(test_server::spawn(denied).await), Duration::from_secs(5)).unwrap();
        assert_matches!(
            client.get_issue("PAY-1").await,
            Err(JiraError::Api { status: 401, body }) if body == "bad token"
        );
    }
}
