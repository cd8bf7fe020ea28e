use std::sync::Arc;
use std::time::Duration;

use beacon_connectors::elasticsearch::ElasticsearchClient;
use beacon_connectors::jenkins::{JenkinsClient, JenkinsCredentials};
use beacon_connectors::jira::{JiraClient, JiraCredentials};
use beacon_connectors::llm::{ChatModel, OpenAiClient};
use beacon_db::{PgOrderStore, PoolSize};

use crate::config::{AppConfig, ConfiguredFlags, ServerConfig};
use crate::error::{AppError, AppResult};
use crate::services::fraud::FraudService;
use crate::services::jenkins::JenkinsService;
use crate::services::jira::JiraService;
use crate::services::jwt::JwtService;
use crate::services::logs::LogService;
use crate::services::orders::OrderService;
use crate::services::reports::ReportRegistry;
use crate::services::security::SecurityService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// A service whose downstream is not configured is `None`; its endpoints
/// answer 503.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub flags: ConfiguredFlags,
    pub orders: Option<Arc<OrderService>>,
    pub jira: Option<Arc<JiraService>>,
    pub security: Option<Arc<SecurityService>>,
    pub logs: Option<Arc<LogService>>,
    pub fraud: Option<Arc<FraudService>>,
    pub jwt: Arc<JwtService>,
    pub jenkins: Option<Arc<JenkinsService>>,
    pub reports: Arc<ReportRegistry>,
}

/// The configured service or a 503 naming it.
pub fn require_service<'a, T>(slot: &'a Option<Arc<T>>, name: &'static str) -> AppResult<&'a T> {
    slot.as_deref().ok_or(AppError::ServiceUnavailable(name))
}

/// Log a client that could not be built and leave its service disabled.
fn built<T, E: std::fmt::Display>(service: &str, result: Result<T, E>) -> Option<T> {
    result
        .inspect_err(|e| tracing::error!(service, error = %e, "Failed to initialise client"))
        .ok()
}

impl AppState {
    /// State with every downstream service disabled.
    pub fn unconfigured(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            flags: ConfiguredFlags::default(),
            orders: None,
            jira: None,
            security: None,
            logs: None,
            fraud: None,
            jwt: Arc::new(JwtService::new(None)),
            jenkins: None,
            reports: Arc::new(ReportRegistry::default()),
        }
    }

    /// Build every configured service. No downstream is contacted here; the
    /// database pool connects lazily.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut state = Self::unconfigured(config.server.clone());
        state.flags = ConfiguredFlags::from(config);

        let llm: Option<Arc<dyn ChatModel>> = config.openai.as_ref().and_then(|s| {
            built(
                "openai",
                OpenAiClient::new(
                    &s.base_url,
                    s.api_key.clone(),
                    s.model.clone(),
                    Duration::from_secs(s.timeout_secs),
                ),
            )
            .map(|client| {
                tracing::info!(model = client.model(), "Chat model client ready");
                Arc::new(client) as Arc<dyn ChatModel>
            })
        });

        if let Some(db) = &config.database {
            let pool = built(
                "database",
                beacon_db::create_pool(
                    &db.url,
                    PoolSize {
                        min: db.pool_min,
                        max: db.pool_max,
                    },
                ),
            );
            if let Some(pool) = pool {
                let store = Arc::new(PgOrderStore::new(pool, db.join_customers));
                state.orders = Some(Arc::new(OrderService::new(
                    store,
                    config.validation.policy.clone(),
                )));
            }
        }

        if let Some(jira) = &config.jira {
            let client = built(
                "jira",
                JiraClient::new(
                    JiraCredentials {
                        base_url: jira.url.clone(),
                        username: jira.username.clone(),
                        api_token: jira.api_token.clone(),
                    },
                    Duration::from_secs(jira.timeout_secs),
                ),
            );
            if let Some(client) = client.map(Arc::new) {
                state.jira = Some(Arc::new(JiraService::new(Arc::clone(&client), llm.clone())));
                match &llm {
                    Some(llm) => {
                        state.security = Some(Arc::new(SecurityService::new(client, Arc::clone(llm))));
                    }
                    None => tracing::warn!("Security analysis disabled: no chat model configured"),
                }
            }
        }

        if let Some(es) = &config.elasticsearch {
            let client = built(
                "elasticsearch",
                ElasticsearchClient::new(es, Duration::from_secs(30)),
            );
            if let Some(client) = client {
                let logs = Arc::new(LogService::new(Arc::new(client), config.log_types.clone()));
                state.fraud = Some(Arc::new(FraudService::new(
                    Arc::clone(&logs),
                    llm.clone(),
                    config.fraud.ai_budget(),
                )));
                state.jwt = Arc::new(JwtService::new(Some(Arc::clone(&logs))));
                state.logs = Some(logs);
            }
        }

        if let Some(jenkins) = &config.jenkins {
            let client = built(
                "jenkins",
                JenkinsClient::new(
                    JenkinsCredentials {
                        base_url: jenkins.url.clone(),
                        username: jenkins.username.clone(),
                        api_token: jenkins.api_token.clone(),
                    },
                    Duration::from_secs(jenkins.timeout_secs),
                ),
            );
            state.jenkins = client.map(|c| Arc::new(JenkinsService::new(Arc::new(c))));
        }

        tracing::info!(
            orders = state.orders.is_some(),
            jira = state.jira.is_some(),
            security = state.security.is_some(),
            logs = state.logs.is_some(),
            jenkins = state.jenkins.is_some(),
            "Services initialised"
        );
        state
    }
}
