//! Elasticsearch query construction and hit shaping for session logs.
//!
//! Each log type (3-D Secure, payment gateway, ...) lives in its own index
//! pattern and names its session/level/component fields. This module turns a
//! [`LogTypeConfig`] plus [`SearchFilters`] into query DSL and flattens the
//! raw `_search` response into [`LogEntry`] records. No I/O happens here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::masking::mask_card_prefix;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const LOG_TYPE_3D_SECURE: &str = "3d-secure";
pub const LOG_TYPE_ENFORCE_XML6: &str = "enforce-xml6";
pub const LOG_TYPE_FULL_AUTH: &str = "full-auth";
pub const LOG_TYPE_PAYMENT_GATEWAY: &str = "payment-gateway";
pub const LOG_TYPE_FRAUD_DETECTION: &str = "fraud-detection";
pub const LOG_TYPE_API_GATEWAY: &str = "api-gateway";

pub const DEFAULT_TIME_RANGE: &str = "24h";
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Supported relative time ranges and their date-math lower bound.
pub const TIME_RANGES: &[(&str, &str)] = &[
    ("1h", "now-1h"),
    ("6h", "now-6h"),
    ("24h", "now-24h"),
    ("7d", "now-7d"),
    ("30d", "now-30d"),
];

/// Maximum number of component buckets returned by the aggregation.
const COMPONENT_BUCKETS: u32 = 50;

// ---------------------------------------------------------------------------
// Log type configuration
// ---------------------------------------------------------------------------

/// Where and how one kind of log is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTypeConfig {
    pub index: String,
    pub session_field: String,
    pub level_field: String,
    pub component_field: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
    /// Extra exact-match filters this log type supports: field → label.
    pub custom_filters: BTreeMap<String, String>,
}

impl LogTypeConfig {
    fn new(
        index: &str,
        display_name: &str,
        description: &str,
        icon: &str,
        custom_filters: &[(&str, &str)],
    ) -> Self {
        Self {
            index: index.to_string(),
            session_field: "sessionId".to_string(),
            level_field: "level".to_string(),
            component_field: "component".to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            custom_filters: custom_filters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Environment variable that overrides the index pattern of a log type,
/// e.g. `3d-secure` → `ES_INDEX_3D_SECURE`.
pub fn index_env_var(log_type: &str) -> String {
    format!("ES_INDEX_{}", log_type.replace('-', "_").to_ascii_uppercase())
}

/// The built-in log types with their default index patterns.
pub fn default_log_types() -> BTreeMap<String, LogTypeConfig> {
    let entries = [
        (
            LOG_TYPE_3D_SECURE,
            LogTypeConfig::new(
                "logs-3d-secure-*",
                "3D Secure Authentication",
                "Analyze 3D Secure authentication logs and transactions",
                "🔐",
                &[
                    ("transactionId", "Transaction ID"),
                    ("merchantId", "Merchant ID"),
                    ("authStatus", "Auth Status"),
                ],
            ),
        ),
        (
            LOG_TYPE_ENFORCE_XML6,
            LogTypeConfig::new(
                "logs-enforce-xml6-*",
                "Enforce XML6",
                "Review XML6 enforcement logs and compliance data",
                "📋",
                &[
                    ("xmlVersion", "XML Version"),
                    ("validationStatus", "Validation Status"),
                    ("complianceLevel", "Compliance Level"),
                ],
            ),
        ),
        (
            LOG_TYPE_FULL_AUTH,
            LogTypeConfig::new(
                "logs-full-auth-*",
                "Full Authentication",
                "Examine full authentication flow logs and results",
                "🔑",
                &[
                    ("authMethod", "Auth Method"),
                    ("userId", "User ID"),
                    ("authResult", "Auth Result"),
                ],
            ),
        ),
        (
            LOG_TYPE_PAYMENT_GATEWAY,
            LogTypeConfig::new(
                "logs-payment-gateway-*",
                "Payment Gateway",
                "Analyze payment gateway transaction logs",
                "💳",
                &[
                    ("paymentId", "Payment ID"),
                    ("gateway", "Gateway"),
                    ("currency", "Currency"),
                ],
            ),
        ),
        (
            LOG_TYPE_FRAUD_DETECTION,
            LogTypeConfig::new(
                "logs-fraud-detection-*",
                "Fraud Detection",
                "Review fraud detection system logs and alerts",
                "🚨",
                &[
                    ("riskScore", "Risk Score"),
                    ("decision", "Decision"),
                    ("ruleSet", "Rule Set"),
                ],
            ),
        ),
        (
            LOG_TYPE_API_GATEWAY,
            LogTypeConfig::new(
                "logs-api-gateway-*",
                "API Gateway",
                "Monitor API gateway access and performance logs",
                "🌐",
                &[
                    ("apiEndpoint", "API Endpoint"),
                    ("httpMethod", "HTTP Method"),
                    ("statusCode", "Status Code"),
                ],
            ),
        ),
    ];

    entries
        .into_iter()
        .map(|(key, config)| (key.to_string(), config))
        .collect()
}

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

/// Optional narrowing of a session log search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// One of [`TIME_RANGES`]; defaults to [`DEFAULT_TIME_RANGE`].
    #[serde(default)]
    pub time_range: Option<String>,
    /// Log level; `all` disables the filter.
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Values for the log type's custom filters; unknown keys are ignored.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

/// `@timestamp` range clause for a relative range, or `None` when the range
/// is not one of [`TIME_RANGES`].
pub fn build_time_filter(time_range: &str) -> Option<Value> {
    TIME_RANGES
        .iter()
        .find(|(key, _)| *key == time_range)
        .map(|(_, gte)| {
            json!({
                "range": {
                    "@timestamp": { "gte": gte, "lte": "now" }
                }
            })
        })
}

/// Build the `_search` body for one session in one log type.
pub fn build_search_query(session_id: &str, config: &LogTypeConfig, filters: &SearchFilters) -> Value {
    let must = vec![json!({ "match": { config.session_field.clone(): session_id } })];
    let mut filter: Vec<Value> = Vec::new();

    let time_range = filters.time_range.as_deref().unwrap_or(DEFAULT_TIME_RANGE);
    if let Some(range) = build_time_filter(time_range) {
        filter.push(range);
    }

    if let Some(level) = non_blank(&filters.log_level) {
        if !level.eq_ignore_ascii_case("all") {
            filter.push(json!({ "term": { config.level_field.clone(): level.to_ascii_uppercase() } }));
        }
    }

    if let Some(component) = non_blank(&filters.component) {
        filter.push(json!({ "term": { config.component_field.clone(): component } }));
    }

    for field in config.custom_filters.keys() {
        if let Some(value) = filters.custom.get(field).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            filter.push(json!({ "term": { field.clone(): value } }));
        }
    }

    json!({
        "query": { "bool": { "must": must, "filter": filter } },
        "sort": [ { "@timestamp": { "order": "desc" } } ],
        "size": filters.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
    })
}

/// Terms aggregation listing the distinct components of a log type.
pub fn components_aggregation_query(config: &LogTypeConfig) -> Value {
    json!({
        "size": 0,
        "aggs": {
            "components": {
                "terms": { "field": config.component_field, "size": COMPONENT_BUCKETS }
            }
        }
    })
}

/// Read the bucket keys out of a [`components_aggregation_query`] response.
pub fn parse_component_buckets(response: &Value) -> Vec<String> {
    response
        .pointer("/aggregations/components/buckets")
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|b| match b.get("key") {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) if !other.is_null() => Some(other.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Hit shaping
// ---------------------------------------------------------------------------

/// One log line, flattened for display and analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub level: String,
    pub message: String,
    pub session_id: String,
    pub component: String,
    /// Log-type specific fields (`payment_id`, `api_endpoint`, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
    pub raw_data: Map<String, Value>,
}

impl LogEntry {
    /// A detail value rendered as text; empty strings and nulls are `None`.
    pub fn detail_text(&self, key: &str) -> Option<String> {
        match self.details.get(key)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        match self.details.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Total hit count plus the flattened entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormattedHits {
    pub total: u64,
    pub logs: Vec<LogEntry>,
}

/// (output key, source key) pairs copied per log type.
fn type_specific_fields(log_type: &str) -> &'static [(&'static str, &'static str)] {
    match log_type {
        LOG_TYPE_3D_SECURE => &[
            ("transaction_id", "transactionId"),
            ("auth_status", "authStatus"),
            ("response_code", "responseCode"),
            ("merchant_id", "merchantId"),
        ],
        LOG_TYPE_FULL_AUTH => &[
            ("auth_method", "authMethod"),
            ("user_id", "userId"),
            ("auth_result", "authResult"),
            ("failure_reason", "failureReason"),
            ("ip_address", "ipAddress"),
            ("user_agent", "userAgent"),
        ],
        LOG_TYPE_PAYMENT_GATEWAY => &[
            ("payment_id", "paymentId"),
            ("amount", "amount"),
            ("currency", "currency"),
            ("gateway_response", "gatewayResponse"),
            ("processing_time", "processingTime"),
        ],
        LOG_TYPE_FRAUD_DETECTION => &[
            ("risk_score", "riskScore"),
            ("fraud_indicators", "fraudIndicators"),
            ("decision", "decision"),
            ("rules_triggered", "rulesTriggered"),
        ],
        LOG_TYPE_API_GATEWAY => &[
            ("api_endpoint", "apiEndpoint"),
            ("http_method", "httpMethod"),
            ("response_time", "responseTime"),
            ("status_code", "statusCode"),
            ("request_size", "requestSize"),
            ("response_size", "responseSize"),
        ],
        _ => &[],
    }
}

fn string_field(source: &Map<String, Value>, key: &str, default: &str) -> String {
    match source.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Flatten one `_search` hit.
pub fn format_hit(hit: &Value, log_type: &str, session_id: &str) -> LogEntry {
    let source = hit
        .get("_source")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut details = Map::new();
    for (out_key, source_key) in type_specific_fields(log_type) {
        let value = source.get(*source_key).cloned().unwrap_or(Value::Null);
        let value = match (*out_key, value) {
            ("fraud_indicators" | "rules_triggered", Value::Null) => Value::Array(vec![]),
            (_, v) => v,
        };
        details.insert(out_key.to_string(), value);
    }

    if log_type == LOG_TYPE_3D_SECURE {
        let masked = source
            .get("cardNumber")
            .and_then(Value::as_str)
            .map(mask_card_prefix)
            .unwrap_or_default();
        details.insert("card_number".to_string(), Value::String(masked));
    }

    LogEntry {
        id: hit.get("_id").and_then(Value::as_str).map(str::to_string),
        timestamp: source.get("@timestamp").and_then(Value::as_str).map(str::to_string),
        level: string_field(&source, "level", "INFO"),
        message: string_field(&source, "message", ""),
        session_id: session_id.to_string(),
        component: string_field(&source, "component", ""),
        details,
        raw_data: source,
    }
}

/// Flatten a whole `_search` response. Accepts both the `{"value": n}` and
/// the legacy integer form of `hits.total`.
pub fn format_search_response(response: &Value, log_type: &str, session_id: &str) -> FormattedHits {
    let hits = response.get("hits");

    let total = match hits.and_then(|h| h.get("total")) {
        Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    };

    let logs = hits
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|hit| format_hit(hit, log_type, session_id))
                .collect()
        })
        .unwrap_or_default();

    FormattedHits { total, logs }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(log_type: &str) -> LogTypeConfig {
        default_log_types().remove(log_type).unwrap()
    }

    #[test]
    fn six_log_types_are_configured() {
        let types = default_log_types();
        assert_eq!(types.len(), 6);
        assert_eq!(types[LOG_TYPE_API_GATEWAY].index, "logs-api-gateway-*");
    }

    #[test]
    fn env_var_names_follow_log_type() {
        assert_eq!(index_env_var("3d-secure"), "ES_INDEX_3D_SECURE");
        assert_eq!(index_env_var("enforce-xml6"), "ES_INDEX_ENFORCE_XML6");
    }

    #[test]
    fn default_query_matches_session_within_a_day() {
        let query = build_search_query("S-1", &config(LOG_TYPE_FULL_AUTH), &SearchFilters::default());

        assert_eq!(query["size"], 100);
        assert_eq!(query["query"]["bool"]["must"][0]["match"]["sessionId"], "S-1");
        assert_eq!(
            query["query"]["bool"]["filter"][0]["range"]["@timestamp"]["gte"],
            "now-24h"
        );
        assert_eq!(query["sort"][0]["@timestamp"]["order"], "desc");
    }

    #[test]
    fn level_component_and_custom_filters() {
        let mut custom = BTreeMap::new();
        custom.insert("paymentId".to_string(), "P-9".to_string());
        custom.insert("notAField".to_string(), "x".to_string());
        let filters = SearchFilters {
            time_range: Some("7d".into()),
            log_level: Some("error".into()),
            component: Some("gateway-core".into()),
            max_results: Some(500),
            custom,
        };

        let query = build_search_query("S-1", &config(LOG_TYPE_PAYMENT_GATEWAY), &filters);
        let filter = query["query"]["bool"]["filter"].as_array().unwrap();

        assert_eq!(filter.len(), 4);
        assert_eq!(filter[0]["range"]["@timestamp"]["gte"], "now-7d");
        assert_eq!(filter[1]["term"]["level"], "ERROR");
        assert_eq!(filter[2]["term"]["component"], "gateway-core");
        assert_eq!(filter[3]["term"]["paymentId"], "P-9");
        assert_eq!(query["size"], 500);
    }

    #[test]
    fn level_all_and_unknown_range_add_no_filter() {
        let filters = SearchFilters {
            time_range: Some("90d".into()),
            log_level: Some("all".into()),
            ..SearchFilters::default()
        };
        let query = build_search_query("S-1", &config(LOG_TYPE_API_GATEWAY), &filters);
        assert!(query["query"]["bool"]["filter"].as_array().unwrap().is_empty());
    }

    #[test]
    fn formats_hits_with_type_specific_fields() {
        let response = json!({
            "took": 3,
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [{
                    "_id": "abc",
                    "_source": {
                        "@timestamp": "2024-05-01T10:00:00Z",
                        "level": "WARN",
                        "message": "payment retried",
                        "paymentId": "P-1",
                        "amount": 42.5,
                        "currency": "EUR"
                    }
                }]
            }
        });

        let formatted = format_search_response(&response, LOG_TYPE_PAYMENT_GATEWAY, "S-1");

        assert_eq!(formatted.total, 1);
        let entry = &formatted.logs[0];
        assert_eq!(entry.id.as_deref(), Some("abc"));
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.component, "");
        assert_eq!(entry.detail_text("payment_id").as_deref(), Some("P-1"));
        assert_eq!(entry.detail_f64("amount"), Some(42.5));
        assert_eq!(entry.detail_text("gateway_response"), None);
    }

    #[test]
    fn legacy_integer_total_and_defaults() {
        let response = json!({ "hits": { "total": 7, "hits": [ { "_id": "x", "_source": {} } ] } });
        let formatted = format_search_response(&response, LOG_TYPE_FRAUD_DETECTION, "S-2");

        assert_eq!(formatted.total, 7);
        assert_eq!(formatted.logs[0].level, "INFO");
        assert_eq!(formatted.logs[0].details["fraud_indicators"], json!([]));
    }

    #[test]
    fn card_numbers_are_masked() {
        let hit = json!({ "_source": { "cardNumber": "4111111111111111" } });
        let entry = format_hit(&hit, LOG_TYPE_3D_SECURE, "S");
        assert_eq!(entry.details["card_number"], "************1111");
    }

    #[test]
    fn component_buckets() {
        let response = json!({
            "aggregations": { "components": { "buckets": [
                { "key": "auth", "doc_count": 3 },
                { "key": "risk", "doc_count": 1 }
            ] } }
        });
        assert_eq!(parse_component_buckets(&response), vec!["auth", "risk"]);
        assert!(parse_component_buckets(&json!({})).is_empty());
    }
}
