//! Elasticsearch REST client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{error_body, http_client};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ElasticsearchError {
    #[error("Search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Elasticsearch API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Cluster facts reported by the connection probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterInfo {
    pub cluster_name: Option<String>,
    pub status: Option<String>,
    pub number_of_nodes: Option<u64>,
    pub elasticsearch_version: String,
}

/// Query execution against log indices.
#[async_trait]
pub trait LogSearch: Send + Sync {
    /// `POST /{index}/_search` with a query DSL body; returns the raw response.
    async fn search(&self, index: &str, query: &Value) -> Result<Value, ElasticsearchError>;

    /// Cluster health plus server version.
    async fn probe(&self) -> Result<ClusterInfo, ElasticsearchError>;
}

#[derive(Debug, Clone)]
pub struct ElasticsearchSettings {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub verify_ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ElasticsearchSettings {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

pub struct ElasticsearchClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl ElasticsearchClient {
    pub fn new(settings: &ElasticsearchSettings, timeout: Duration) -> Result<Self, ElasticsearchError> {
        let credentials = match (&settings.username, &settings.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };
        Ok(Self {
            client: http_client(timeout, !settings.verify_ssl)?,
            base_url: settings.base_url(),
            credentials,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, ElasticsearchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ElasticsearchError::Api {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }
        Ok(response.json().await?)
    }

    async fn version(&self) -> String {
        let version = async {
            let response = self
                .request(reqwest::Method::GET, "/")
                .timeout(VERSION_TIMEOUT)
                .send()
                .await?;
            let root = Self::parse_response(response).await?;
            Ok::<_, ElasticsearchError>(
                root.pointer("/version/number")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            )
        };
        match version.await {
            Ok(Some(number)) => number,
            Ok(None) => "Unknown".to_string(),
            Err(e) => {
                tracing::debug!(error = %e, "Could not read Elasticsearch version");
                "Unknown".to_string()
            }
        }
    }
}

#[async_trait]
impl LogSearch for ElasticsearchClient {
    async fn search(&self, index: &str, query: &Value) -> Result<Value, ElasticsearchError> {
        tracing::debug!(%index, "Executing Elasticsearch search");
        let response = self
            .request(reqwest::Method::POST, &format!("/{index}/_search"))
            .json(query)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn probe(&self) -> Result<ClusterInfo, ElasticsearchError> {
        let response = self
            .request(reqwest::Method::GET, "/_cluster/health")
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        let health = Self::parse_response(response).await?;

        Ok(ClusterInfo {
            cluster_name: health.get("cluster_name").and_then(Value::as_str).map(str::to_string),
            status: health.get("status").and_then(Value::as_str).map(str::to_string),
            number_of_nodes: health.get("number_of_nodes").and_then(Value::as_u64),
            elasticsearch_version: self.version().await,
        })
    }
}
