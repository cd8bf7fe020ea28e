use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::AppState;

/// Health and connectivity routes, mounted under `/api`.
///
/// ```text
/// GET /health             -> health_check
/// GET /test-connections   -> test_connections
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/test-connections", get(health::test_connections))
}
