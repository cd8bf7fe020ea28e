#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use beacon_connectors::elasticsearch::{ClusterInfo, ElasticsearchError, LogSearch};
use beacon_connectors::llm::{ChatModel, LlmError};
use beacon_core::log_query::default_log_types;
use beacon_core::order_validation::{MandatoryFieldPolicy, OrderRecord};
use beacon_core::prompts::GenerationParams;
use beacon_db::{OrderStore, StoreProbe};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use beacon_api::config::ServerConfig;
use beacon_api::router::build_app_router;
use beacon_api::services::fraud::{AiBudget, FraudService};
use beacon_api::services::jwt::JwtService;
use beacon_api::services::logs::LogService;
use beacon_api::services::orders::OrderService;
use beacon_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5000".to_string()],
        request_timeout_secs: 30,
    }
}

/// State with every downstream disabled.
pub fn empty_state() -> AppState {
    AppState::unconfigured(test_config())
}

/// The production router over the given state.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Order store answering every lookup with the same row (or failure), and
/// recording the identifiers it was asked for.
#[derive(Default)]
pub struct FakeOrderStore {
    pub record: Option<OrderRecord>,
    pub fail: bool,
    pub lookups: Mutex<Vec<(String, String)>>,
}

impl FakeOrderStore {
    pub fn with_record(record: Value) -> Self {
        Self {
            record: record.as_object().cloned(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl OrderStore for FakeOrderStore {
    async fn find_order(
        &self,
        order_number: &str,
        location_code: &str,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        self.lookups
            .lock()
            .unwrap()
            .push((order_number.to_string(), location_code.to_string()));
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.record.clone())
    }

    async fn probe(&self) -> Result<StoreProbe, sqlx::Error> {
        Ok(StoreProbe {
            message: "Database connection successful".to_string(),
            orders_table_accessible: true,
            orders_table_error: None,
        })
    }
}

/// Chat model answering every prompt with the same reply; `None` fails.
pub struct FakeChatModel {
    pub reply: Option<String>,
    pub delay: Duration,
    pub calls: Mutex<usize>,
}

impl FakeChatModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            delay: Duration::ZERO,
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: Duration::ZERO,
            calls: Mutex::new(0),
        }
    }

    /// Answers `reply` only after `delay`.
    pub fn slow(reply: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::replying(reply)
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn complete(&self, _prompt: &str, _params: GenerationParams) -> Result<String, LlmError> {
        *self.calls.lock().unwrap() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().ok_or(LlmError::EmptyReply)
    }
}

/// Log search returning canned `_source` documents per index pattern.
#[derive(Default)]
pub struct FakeLogSearch {
    pub sources: HashMap<String, Vec<Value>>,
}

impl FakeLogSearch {
    pub fn with_index(mut self, index: &str, sources: Vec<Value>) -> Self {
        self.sources.insert(index.to_string(), sources);
        self
    }
}

#[async_trait]
impl LogSearch for FakeLogSearch {
    async fn search(&self, index: &str, _query: &Value) -> Result<Value, ElasticsearchError> {
        let sources = self.sources.get(index).cloned().unwrap_or_default();
        let hits: Vec<Value> = sources
            .into_iter()
            .enumerate()
            .map(|(i, source)| json!({ "_id": format!("{index}-{i}"), "_source": source }))
            .collect();
        Ok(json!({
            "took": 3,
            "hits": { "total": { "value": hits.len() }, "hits": hits },
        }))
    }

    async fn probe(&self) -> Result<ClusterInfo, ElasticsearchError> {
        Ok(ClusterInfo {
            cluster_name: Some("test".to_string()),
            status: Some("green".to_string()),
            number_of_nodes: Some(1),
            elasticsearch_version: "8.11.0".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// State builders
// ---------------------------------------------------------------------------

pub fn with_orders(mut state: AppState, store: Arc<FakeOrderStore>, policy: MandatoryFieldPolicy) -> AppState {
    state.orders = Some(Arc::new(OrderService::new(store, policy)));
    state
}

pub const TEST_AI_BUDGET: AiBudget = AiBudget {
    max_calls: 50,
    max_time: Duration::from_secs(60),
};

pub fn with_logs(state: AppState, search: FakeLogSearch, llm: Option<Arc<dyn ChatModel>>) -> AppState {
    with_logs_budget(state, search, llm, TEST_AI_BUDGET)
}

pub fn with_logs_budget(
    mut state: AppState,
    search: FakeLogSearch,
    llm: Option<Arc<dyn ChatModel>>,
    budget: AiBudget,
) -> AppState {
    let logs = Arc::new(LogService::new(Arc::new(search), default_log_types()));
    state.fraud = Some(Arc::new(FraudService::new(Arc::clone(&logs), llm, budget)));
    state.jwt = Arc::new(JwtService::new(Some(Arc::clone(&logs))));
    state.logs = Some(logs);
    state
}

// ---------------------------------------------------------------------------
// Downstream stand-ins
// ---------------------------------------------------------------------------

/// Serve `app` on an ephemeral port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}
