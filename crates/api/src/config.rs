//! Typed settings loaded from environment variables.
//!
//! Each downstream system has its own settings struct. A downstream whose
//! credentials are incomplete is logged with the missing variable names and
//! left unconfigured (`None`); its endpoints then answer 503. Malformed
//! values (a non-numeric port, an unknown policy) fail startup instead.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use beacon_connectors::elasticsearch::ElasticsearchSettings;
use beacon_core::log_query::{default_log_types, index_env_var, LogTypeConfig};
use beacon_core::order_validation::{
    MandatoryFieldPolicy, DEFAULT_MANDATORY_FIELDS, DEFAULT_OPTIONAL_FIELDS, POLICY_ALLOWLIST,
};

use crate::services::fraud::AiBudget;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{0}")]
    Policy(String),
}

// ---------------------------------------------------------------------------
// Environment helpers
// ---------------------------------------------------------------------------

/// Trimmed value of `name`, `None` when unset or blank.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env_var(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
        Some(value) => Err(ConfigError::Invalid { name, value }),
    }
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env_var(name).map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Values of the named variables, or `None` after logging which are missing.
fn require<const N: usize>(service: &str, names: [&str; N]) -> Option<[String; N]> {
    let values = names.map(env_var);
    let missing: Vec<&str> = names
        .iter()
        .zip(&values)
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        tracing::warn!(
            service,
            missing = %missing.join(", "),
            "Missing environment variables, service disabled"
        );
        return None;
    }
    Some(values.map(Option::unwrap_or_default))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Whole-request timeout in seconds (default: `300`). Fraud analysis
    /// makes many model calls, so this is generous.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `5000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5000` |
    /// | `REQUEST_TIMEOUT_SECS` | `300`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env_parse("PORT", 5000)?,
            cors_origins: env_list("CORS_ORIGINS")
                .unwrap_or_else(|| vec!["http://localhost:5000".to_string()]),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 300)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Downstream systems
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub url: String,
    pub username: String,
    pub api_token: String,
    pub timeout_secs: u64,
}

impl JiraSettings {
    /// `JIRA_URL`, `JIRA_USERNAME`, `JIRA_TOKEN`; `JIRA_TIMEOUT_SECS` (30).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([url, username, api_token]) =
            require("jira", ["JIRA_URL", "JIRA_USERNAME", "JIRA_TOKEN"])
        else {
            return Ok(None);
        };
        Ok(Some(Self {
            url,
            username,
            api_token,
            timeout_secs: env_parse("JIRA_TIMEOUT_SECS", 30)?,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OpenAiSettings {
    /// `OPENAI_API_KEY`; `OPENAI_MODEL`, `OPENAI_BASE_URL`,
    /// `OPENAI_TIMEOUT_SECS` (60).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([api_key]) = require("openai", ["OPENAI_API_KEY"]) else {
            return Ok(None);
        };
        Ok(Some(Self {
            api_key,
            model: env_var("OPENAI_MODEL")
                .unwrap_or_else(|| beacon_connectors::llm::DEFAULT_MODEL.to_string()),
            base_url: env_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| beacon_connectors::llm::DEFAULT_BASE_URL.to_string()),
            timeout_secs: env_parse("OPENAI_TIMEOUT_SECS", 60)?,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_min: u32,
    pub pool_max: u32,
    /// LEFT JOIN `customers` into order lookups.
    pub join_customers: bool,
}

impl DatabaseSettings {
    /// `DATABASE_URL`; `DB_POOL_MIN` (2), `DB_POOL_MAX` (10),
    /// `ORDER_JOIN_CUSTOMERS` (false).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([url]) = require("database", ["DATABASE_URL"]) else {
            return Ok(None);
        };
        Ok(Some(Self {
            url,
            pool_min: env_parse("DB_POOL_MIN", 2)?,
            pool_max: env_parse("DB_POOL_MAX", 10)?,
            join_customers: env_bool("ORDER_JOIN_CUSTOMERS", false)?,
        }))
    }
}

/// `ELASTICSEARCH_HOST`, `ELASTICSEARCH_USERNAME`, `ELASTICSEARCH_PASSWORD`;
/// `ELASTICSEARCH_PORT` (9200), `ELASTICSEARCH_USE_SSL` (false),
/// `ELASTICSEARCH_VERIFY_SSL` (true).
pub fn elasticsearch_from_env() -> Result<Option<ElasticsearchSettings>, ConfigError> {
    let Some([host, username, password]) = require(
        "elasticsearch",
        [
            "ELASTICSEARCH_HOST",
            "ELASTICSEARCH_USERNAME",
            "ELASTICSEARCH_PASSWORD",
        ],
    ) else {
        return Ok(None);
    };
    Ok(Some(ElasticsearchSettings {
        host,
        port: env_parse("ELASTICSEARCH_PORT", 9200)?,
        use_ssl: env_bool("ELASTICSEARCH_USE_SSL", false)?,
        verify_ssl: env_bool("ELASTICSEARCH_VERIFY_SSL", true)?,
        username: Some(username),
        password: Some(password),
    }))
}

/// Built-in log types with `ES_INDEX_*` overrides applied.
pub fn log_types_from_env() -> BTreeMap<String, LogTypeConfig> {
    let mut log_types = default_log_types();
    for (log_type, config) in log_types.iter_mut() {
        if let Some(index) = env_var(&index_env_var(log_type)) {
            config.index = index;
        }
    }
    log_types
}

#[derive(Debug, Clone)]
pub struct JenkinsSettings {
    pub url: String,
    pub username: String,
    pub api_token: String,
    pub timeout_secs: u64,
}

impl JenkinsSettings {
    /// `JENKINS_URL`, `JENKINS_USERNAME`, `JENKINS_TOKEN`;
    /// `JENKINS_TIMEOUT_SECS` (30).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([url, username, api_token]) =
            require("jenkins", ["JENKINS_URL", "JENKINS_USERNAME", "JENKINS_TOKEN"])
        else {
            return Ok(None);
        };
        Ok(Some(Self {
            url,
            username,
            api_token,
            timeout_secs: env_parse("JENKINS_TIMEOUT_SECS", 30)?,
        }))
    }
}

// ---------------------------------------------------------------------------
// Behaviour
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ValidationSettings {
    pub policy: MandatoryFieldPolicy,
}

impl ValidationSettings {
    /// `ORDER_FIELD_POLICY` (`allowlist` | `all_except`),
    /// `ORDER_MANDATORY_FIELDS`, `ORDER_OPTIONAL_FIELDS` (comma lists).
    pub fn from_env() -> Result<Self, ConfigError> {
        let name = env_var("ORDER_FIELD_POLICY").unwrap_or_else(|| POLICY_ALLOWLIST.to_string());
        let mandatory = env_list("ORDER_MANDATORY_FIELDS").unwrap_or_else(|| {
            DEFAULT_MANDATORY_FIELDS.iter().map(|s| s.to_string()).collect()
        });
        let optional = env_list("ORDER_OPTIONAL_FIELDS").unwrap_or_else(|| {
            DEFAULT_OPTIONAL_FIELDS.iter().map(|s| s.to_string()).collect()
        });
        let policy =
            MandatoryFieldPolicy::from_config(&name, mandatory, optional).map_err(ConfigError::Policy)?;
        Ok(Self { policy })
    }
}

#[derive(Debug, Clone)]
pub struct FraudSettings {
    /// Log entries analysed by the model per session; later entries use the
    /// heuristic analysis.
    pub max_ai_calls: usize,
    /// Wall time for all per-entry model calls of one session. The analysis
    /// then makes one more call (session insights, up to
    /// `OPENAI_TIMEOUT_SECS`), and the whole request is cut off by
    /// `REQUEST_TIMEOUT_SECS`, so keep the sum of the two below it.
    pub ai_time_budget_secs: u64,
}

impl FraudSettings {
    /// `FRAUD_MAX_AI_CALLS` (50), `FRAUD_AI_BUDGET_SECS` (180).
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_ai_calls: env_parse("FRAUD_MAX_AI_CALLS", 50)?,
            ai_time_budget_secs: env_parse("FRAUD_AI_BUDGET_SECS", 180)?,
        })
    }

    pub fn ai_budget(&self) -> AiBudget {
        AiBudget {
            max_calls: self.max_ai_calls,
            max_time: Duration::from_secs(self.ai_time_budget_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Everything
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub jira: Option<JiraSettings>,
    pub openai: Option<OpenAiSettings>,
    pub database: Option<DatabaseSettings>,
    pub elasticsearch: Option<ElasticsearchSettings>,
    pub log_types: BTreeMap<String, LogTypeConfig>,
    pub jenkins: Option<JenkinsSettings>,
    pub validation: ValidationSettings,
    pub fraud: FraudSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            server: ServerConfig::from_env()?,
            jira: JiraSettings::from_env()?,
            openai: OpenAiSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            elasticsearch: elasticsearch_from_env()?,
            log_types: log_types_from_env(),
            jenkins: JenkinsSettings::from_env()?,
            validation: ValidationSettings::from_env()?,
            fraud: FraudSettings::from_env()?,
        };
        if !config.fraud_fits_request_timeout() {
            tracing::warn!(
                budget_secs = config.fraud.ai_time_budget_secs,
                request_timeout_secs = config.server.request_timeout_secs,
                "Fraud analysis time budget plus one model timeout exceeds the request timeout"
            );
        }
        Ok(config)
    }

    /// Whether a fraud analysis that spends its whole model budget can still
    /// answer before the request timeout.
    pub fn fraud_fits_request_timeout(&self) -> bool {
        let llm_timeout = self.openai.as_ref().map_or(0, |o| o.timeout_secs);
        self.fraud.ai_time_budget_secs + llm_timeout < self.server.request_timeout_secs
    }
}

/// Which downstream systems have complete credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConfiguredFlags {
    pub jira_configured: bool,
    pub openai_configured: bool,
    pub database_configured: bool,
    pub elasticsearch_configured: bool,
    pub jenkins_configured: bool,
}

impl From<&AppConfig> for ConfiguredFlags {
    fn from(config: &AppConfig) -> Self {
        Self {
            jira_configured: config.jira.is_some(),
            openai_configured: config.openai.is_some(),
            database_configured: config.database.is_some(),
            elasticsearch_configured: config.elasticsearch.is_some(),
            jenkins_configured: config.jenkins.is_some(),
        }
    }
}
