use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use resume_optimizer::config::Config;
use resume_optimizer::llm_client::LlmClient;
use resume_optimizer::pipeline::knowledge_store::DocumentKnowledgeStore;
use resume_optimizer::pipeline::orchestrator::Orchestrator;
use resume_optimizer::pipeline::skill_graph::SnapshotSkillGraph;
use resume_optimizer::pipeline::web_search::{DisabledSearch, DuckDuckGoSearch};
use resume_optimizer::pipeline::{Collaborators, WebSearch};
use resume_optimizer::store::RedisStore;
use resume_optimizer::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("Starting resume-optimizer worker v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await?
            .with_queue_name(&config.queue_name),
    );
    info!("Redis connected (queue: {})", store.queue_name());

    let llm = Arc::new(LlmClient::new(
        config.llm_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_model.clone(),
    )?);
    info!("LLM client initialized (model: {})", llm.model());

    // Missing reference data degrades those branches to placeholders instead of
    // keeping the worker down.
    let skill_graph = match SnapshotSkillGraph::load(&config.skill_graph_path).await {
        Ok(graph) => graph,
        Err(e) => {
            warn!("Skill graph unavailable ({}): {e}", config.skill_graph_path);
            SnapshotSkillGraph::default()
        }
    };
    let knowledge_store = match DocumentKnowledgeStore::load(&config.knowledge_store_path).await {
        Ok(store) => store,
        Err(e) => {
            warn!(
                "Knowledge store unavailable ({}): {e}",
                config.knowledge_store_path
            );
            DocumentKnowledgeStore::default()
        }
    };

    let web_search: Arc<dyn WebSearch> = if config.web_search_enabled {
        info!("Web search enabled (DuckDuckGo)");
        Arc::new(DuckDuckGoSearch::new()?)
    } else {
        info!("Web search disabled");
        Arc::new(DisabledSearch)
    };

    let collaborators = Collaborators {
        cleaner: llm.clone(),
        extractor: llm.clone(),
        skill_graph: Arc::new(skill_graph),
        knowledge_store: Arc::new(knowledge_store),
        web_search,
        report_writer: llm,
    };

    let orchestrator = Orchestrator::new(
        store.clone(),
        store,
        collaborators,
        config.pop_timeout,
    );

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; stopping after the current task");
            let _ = stop.send(true);
        }
    });

    orchestrator.run(shutdown).await;
    Ok(())
}
