use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Service configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub queue_name: String,
    pub pop_timeout: Duration,
    pub skill_graph_path: String,
    pub knowledge_store_path: String,
    pub web_search_enabled: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            llm_api_key: require_env("LLM_API_KEY")?,
            llm_base_url: env_or("LLM_BASE_URL", DEFAULT_BASE_URL),
            llm_model: env_or("LLM_MODEL", DEFAULT_MODEL),
            queue_name: env_or("QUEUE_NAME", crate::store::DEFAULT_QUEUE_NAME),
            pop_timeout: Duration::from_secs(
                env_or("POP_TIMEOUT_SECS", "5")
                    .parse::<u64>()
                    .context("POP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            skill_graph_path: env_or("SKILL_GRAPH_PATH", "data/kg_job_info.json"),
            knowledge_store_path: env_or("KNOWLEDGE_STORE_PATH", "data/knowledge_store.json"),
            web_search_enabled: env_or("WEB_SEARCH_ENABLED", "false")
                .parse::<bool>()
                .context("WEB_SEARCH_ENABLED must be 'true' or 'false'")?,
            port: env_or("PORT", "8000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
