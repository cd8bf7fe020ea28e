pub mod health;
pub mod jenkins;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{fraud, jira, logs, orders, reports};
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                                    health + configuration flags
/// /test-connections                          probe every downstream
///
/// /validate-order                            order validation (POST)
/// /order-info                                order lookup (POST)
///
/// /query                                     natural-language Jira search (POST)
/// /issues/{key}                              Jira issue
/// /security-analysis                         issue security analysis (POST)
///
/// /log-types                                 log type configuration
/// /log-components/{log_type}                 distinct components
/// /search-logs                               session log search (POST)
///
/// /fraud-types                               fraud type catalog
/// /fraud-analysis                            fraud session analysis (POST)
/// /jwt-analysis                              JWT claims preview (POST)
///
/// /jenkins/...                               see routes::jenkins
/// /jenkins-trigger-job                       trigger build (POST)
///
/// /reports                                   render .docx (POST)
/// /reports/{id}                              download
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        // Orders.
        .route("/validate-order", post(orders::validate_order))
        .route("/order-info", post(orders::order_info))
        // Jira.
        .route("/query", post(jira::query))
        .route("/issues/{key}", get(jira::get_issue))
        .route("/security-analysis", post(jira::security_analysis))
        // Logs.
        .route("/log-types", get(logs::log_types))
        .route("/log-components/{log_type}", get(logs::log_components))
        .route("/search-logs", post(logs::search_logs))
        // Fraud.
        .route("/fraud-types", get(fraud::fraud_types))
        .route("/fraud-analysis", post(fraud::fraud_analysis))
        .route("/jwt-analysis", post(fraud::jwt_analysis))
        // Jenkins.
        .nest("/jenkins", jenkins::router())
        .route(
            "/jenkins-trigger-job",
            post(crate::handlers::jenkins::trigger_job),
        )
        // Reports.
        .route("/reports", post(reports::create_report))
        .route("/reports/{id}", get(reports::download_report))
}
