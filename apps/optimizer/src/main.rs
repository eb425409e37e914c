use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use resume_optimizer::config::Config;
use resume_optimizer::llm_client::LlmClient;
use resume_optimizer::routes::build_router;
use resume_optimizer::state::AppState;
use resume_optimizer::store::RedisStore;
use resume_optimizer::task_id::TaskIdGenerator;
use resume_optimizer::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("Starting resume-optimizer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Redis (queue + result store share one connection)
    let store = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await?
            .with_queue_name(&config.queue_name),
    );
    info!("Redis connected (queue: {})", store.queue_name());

    // Initialize LLM client (chat endpoint only)
    let llm = LlmClient::new(
        config.llm_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    let state = AppState {
        queue: store.clone(),
        results: store,
        ids: Arc::new(TaskIdGenerator::new()),
        llm,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
