//! HTTP 路由

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, ApiState};

/// ```text
/// GET  /
/// GET  /api/v1/health
/// POST /api/v1/emitir
/// GET  /api/v1/status/{task_id}
/// POST /api/v1/validate
/// POST /api/v1/nota-credito
/// ```
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/emitir", post(handlers::submit_emission))
        .route("/api/v1/status/{task_id}", get(handlers::task_status))
        .route("/api/v1/validate", post(handlers::validate))
        .route("/api/v1/nota-credito", post(handlers::submit_credit_note))
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
