pub mod config;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod store;
pub mod task_id;
pub mod telemetry;
