//! Jenkins remote access API client.

use std::time::Duration;

use reqwest::Url;
use serde_json::Value;

use crate::{error_body, http_client};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const LAST_BUILD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum JenkinsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Authentication failed: Invalid username or token")]
    Unauthorized,

    #[error("Access denied: Insufficient permissions")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {status}")]
    Api { status: u16, body: String },

    #[error("Queue location does not belong to this Jenkins server: {0}")]
    ForeignQueueLocation(String),
}

#[derive(Debug, Clone)]
pub struct JenkinsCredentials {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
}

pub struct JenkinsClient {
    client: reqwest::Client,
    credentials: JenkinsCredentials,
}

impl JenkinsClient {
    pub fn new(mut credentials: JenkinsCredentials, timeout: Duration) -> Result<Self, JenkinsError> {
        credentials.base_url = credentials.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client: http_client(timeout, false)?,
            credentials,
        })
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
    }

    /// `GET /api/json` on the server root.
    pub async fn server_info(&self) -> Result<Value, JenkinsError> {
        let response = self
            .get(format!("{}/api/json", self.credentials.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        Self::parse_response(response, "/api/json").await
    }

    /// `GET /job/{name}/api/json`.
    pub async fn job_info(&self, job_name: &str) -> Result<Value, JenkinsError> {
        let response = self
            .get(format!("{}/job/{job_name}/api/json", self.credentials.base_url))
            .send()
            .await?;
        Self::parse_response(response, job_name).await
    }

    /// `GET /job/{name}/{number}/api/json`.
    pub async fn build_info(&self, job_name: &str, build_number: u64) -> Result<Value, JenkinsError> {
        let response = self
            .get(format!(
                "{}/job/{job_name}/{build_number}/api/json",
                self.credentials.base_url
            ))
            .send()
            .await?;
        Self::parse_response(response, &format!("{job_name} #{build_number}")).await
    }

    /// Last build details, `None` on any failure.
    pub async fn last_build_info(&self, job_name: &str, build_number: u64) -> Option<Value> {
        let response = self
            .get(format!(
                "{}/job/{job_name}/{build_number}/api/json",
                self.credentials.base_url
            ))
            .timeout(LAST_BUILD_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json().await.ok()
    }

    /// Form-encoded `POST /job/{name}/buildWithParameters`. Returns the queue
    /// item URL from the `Location` header.
    pub async fn trigger(
        &self,
        job_name: &str,
        form: &[(String, String)],
    ) -> Result<Option<String>, JenkinsError> {
        let response = self
            .client
            .post(format!(
                "{}/job/{job_name}/buildWithParameters",
                self.credentials.base_url
            ))
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
            .form(form)
            .send()
            .await?;
        let response = Self::ensure_success(response, job_name).await?;

        Ok(response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    /// State of a queue item given its `Location` URL or numeric id.
    pub async fn queue_item(&self, queue_location: &str) -> Result<Value, JenkinsError> {
        let url = queue_api_url(&self.credentials.base_url, queue_location)?;
        let response = self.get(url).send().await?;
        Self::parse_response(response, queue_location).await
    }

    async fn ensure_success(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, JenkinsError> {
        match response.status().as_u16() {
            200..=299 => Ok(response),
            401 => Err(JenkinsError::Unauthorized),
            403 => Err(JenkinsError::Forbidden),
            404 => Err(JenkinsError::NotFound(what.to_string())),
            status => Err(JenkinsError::Api {
                status,
                body: error_body(response).await,
            }),
        }
    }

    async fn parse_response(response: reqwest::Response, what: &str) -> Result<Value, JenkinsError> {
        let response = Self::ensure_success(response, what).await?;
        Ok(response.json().await?)
    }
}

fn is_queue_id(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// `{base}/queue/item/{id}/api/json` for a queue `Location` URL on this
/// server, or for a bare id.
///
/// A location must share the server's scheme, host and port, and its
/// normalized path must be `{base path}/queue/item/{digits}` with an optional
/// trailing slash. Credentials, queries and fragments are refused.
pub fn queue_api_url(base_url: &str, queue_location: &str) -> Result<String, JenkinsError> {
    let location = queue_location.trim();
    if is_queue_id(location) {
        return Ok(format!("{base_url}/queue/item/{location}/api/json"));
    }

    let foreign = || JenkinsError::ForeignQueueLocation(location.to_string());
    let base = Url::parse(base_url).map_err(|_| foreign())?;
    let url = Url::parse(location).map_err(|_| foreign())?;

    let same_origin = url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default();
    if !same_origin
        || !url.username().is_empty()
        || url.password().is_some()
        || url.query().is_some()
        || url.fragment().is_some()
    {
        return Err(foreign());
    }

    let id = url
        .path()
        .strip_prefix(base.path().trim_end_matches('/'))
        .and_then(|rest| rest.strip_prefix("/queue/item/"))
        .map(|rest| rest.strip_suffix('/').unwrap_or(rest))
        .filter(|id| is_queue_id(id))
        .ok_or_else(foreign)?;
    Ok(format!("{base_url}/queue/item/{id}/api/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use assert_matches::assert_matches;
    use axum::http::{header, StatusCode};
    use axum::routing::{get, post};
    use axum::{Form, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn client(base_url: String) -> JenkinsClient {
        JenkinsClient::new(
            JenkinsCredentials {
                base_url,
                username: "ci".into(),
                api_token: "token".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn queue_urls() {
        let base = "https://ci.example.com";
        assert_eq!(
            queue_api_url(base, "https://ci.example.com/queue/item/17/").unwrap(),
            "https://ci.example.com/queue/item/17/api/json"
        );
        assert_eq!(
            queue_api_url(base, "17").unwrap(),
            "https://ci.example.com/queue/item/17/api/json"
        );
        assert_matches!(
            queue_api_url(base, "https://evil.example.com/queue/item/17/"),
            Err(JenkinsError::ForeignQueueLocation(_))
        );
    }

    #[test]
    fn queue_urls_under_a_base_path() {
        let base = "https://ci.example.com/jenkins";
        assert_eq!(
            queue_api_url(base, "https://ci.example.com/jenkins/queue/item/9").unwrap(),
            "https://ci.example.com/jenkins/queue/item/9/api/json"
        );
        assert_matches!(
            queue_api_url(base, "https://ci.example.com/queue/item/9/"),
            Err(JenkinsError::ForeignQueueLocation(_))
        );
    }

    #[test]
    fn queue_urls_cannot_leave_the_queue() {
        let base = "https://ci.example.com";
        for location in [
            "https://ci.example.com/queue/item/../../scriptText?x=",
            "https://ci.example.com/queue/item/1/../../../script",
            "https://ci.example.com/queue/item/%2e%2e/%2e%2e/script",
            "https://ci.example.com/queue/item/1?",
            "https://ci.example.com/queue/item/1/#frag",
            "https://ci.example.com/queue/item/1/cancelQueue",
            "https://ci.example.com:8443/queue/item/1/",
            "http://ci.example.com/queue/item/1/",
            "https://admin:pw@ci.example.com/queue/item/1/",
            "https://ci.example.com.evil.net/queue/item/1/",
            "/queue/item/1/",
        ] {
            assert_matches!(
                queue_api_url(base, location),
                Err(JenkinsError::ForeignQueueLocation(_)),
                "{location}"
            );
        }
    }

    #[tokio::test]
    async fn trigger_returns_queue_location() {
        let app = Router::new().route(
            "/job/{name}/buildWithParameters",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                assert_eq!(form["email_id"], "a@b.com");
                (
                    StatusCode::CREATED,
                    [(header::LOCATION, "http://ci/queue/item/5/")],
                )
            }),
        );
        let jenkins = client(test_server::spawn(app).await);

        let location = jenkins
            .trigger("fraud-story-prediction", &[("email_id".into(), "a@b.com".into())])
            .await
            .unwrap();

        assert_eq!(location.as_deref(), Some("http://ci/queue/item/5/"));
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let app = Router::new()
            .route("/job/locked/api/json", get(|| async { StatusCode::FORBIDDEN }))
            .route("/job/secret/api/json", get(|| async { StatusCode::UNAUTHORIZED }))
            .route("/job/ok/api/json", get(|| async { Json(json!({"buildable": true})) }));
        let jenkins = client(test_server::spawn(app).await);

        assert_matches!(jenkins.job_info("locked").await, Err(JenkinsError::Forbidden));
        assert_matches!(jenkins.job_info("secret").await, Err(JenkinsError::Unauthorized));
        assert_matches!(jenkins.job_info("gone").await, Err(JenkinsError::NotFound(name)) if name == "gone");
        assert_eq!(jenkins.job_info("ok").await.unwrap()["buildable"], true);
    }
}
