use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jenkins;
use crate::state::AppState;

/// Routes mounted at `/api/jenkins`.
///
/// ```text
/// GET  /jobs                                -> list_jobs
/// GET  /jobs/{job_type}                     -> job_info
/// POST /validate-parameters                 -> validate_job_parameters
/// GET  /builds/{job_type}/{build_number}    -> build_status
/// POST /queue-status                        -> queue_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(jenkins::list_jobs))
        .route("/jobs/{job_type}", get(jenkins::job_info))
        .route("/validate-parameters", post(jenkins::validate_job_parameters))
        .route("/builds/{job_type}/{build_number}", get(jenkins::build_status))
        .route("/queue-status", post(jenkins::queue_status))
}
