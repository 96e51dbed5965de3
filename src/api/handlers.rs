use axum::{extract::State, Json};
use std::sync::Arc;

use super::{HealthResponse, JobOutput, JobRequest};
use crate::api::routes::AppState;

/// Run a single synthesis job. The response is always 200; failures are
/// reported inside the result payload.
pub async fn run_job(
    State(state): State<Arc<AppState>>,
    Json(job): Json<JobRequest>,
) -> Json<JobOutput> {
    if let Some(id) = &job.id {
        tracing::info!("Processing job {}", id);
    }
    Json(state.handler.handle(job.input).await)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
