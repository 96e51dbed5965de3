use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::job::JobHandler;

pub struct AppState {
    pub handler: JobHandler,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/run", post(handlers::run_job))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
