pub mod health;
pub mod tasks;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/resume_optimization",
            post(tasks::handle_submit).layer(DefaultBodyLimit::max(tasks::MAX_UPLOAD_BYTES)),
        )
        .route(
            "/get_resume_optimization_result",
            post(tasks::handle_get_result),
        )
        .route("/resume_optimization_chat", post(tasks::handle_chat))
        .with_state(state)
}
