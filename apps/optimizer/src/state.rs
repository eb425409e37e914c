use std::sync::Arc;

use crate::llm_client::LlmClient;
use crate::store::{ResultStore, TaskQueue};
use crate::task_id::TaskIdGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn TaskQueue>,
    pub results: Arc<dyn ResultStore>,
    /// One generator per process; every submission draws its ID from here.
    pub ids: Arc<TaskIdGenerator>,
    /// Used directly by the chat endpoint only. Scoring runs in the worker.
    pub llm: LlmClient,
}
