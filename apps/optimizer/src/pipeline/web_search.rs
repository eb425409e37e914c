//! Web search collaborators.
//!
//! `DuckDuckGoSearch` queries the DuckDuckGo Instant Answer API once per query and
//! folds the snippets into one block with a `### 关键词：<query>` header per query.
//! `DisabledSearch` answers every batch with the "nothing available" placeholder.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::pipeline::orchestrator::NO_CONTENT;
use crate::pipeline::{BranchError, WebSearch};

const DDG_ENDPOINT: &str = "https://api.duckduckgo.com/";
const DEFAULT_MAX_RESULTS: usize = 3;
const SEARCH_TIMEOUT_SECS: u64 = 10;

const NO_VALID_QUERIES: &str = "未提供有效搜索关键词，无法获取结果";
const NO_RESULTS: &str = "所有关键词均未搜索到有效结果";

/// Web search switched off; every batch yields [`NO_CONTENT`].
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, _queries: &[String]) -> Result<String, BranchError> {
        Ok(NO_CONTENT.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    // Grouped topics carry `Topics` instead of `Text`; those are skipped.
    #[serde(rename = "Text")]
    text: Option<String>,
}

pub struct DuckDuckGoSearch {
    client: Client,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, BranchError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
                .build()?,
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    async fn lookup(&self, query: &str) -> Result<String, reqwest::Error> {
        let answer: InstantAnswer = self
            .client
            .get(DDG_ENDPOINT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(snippets(&answer, self.max_results))
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, queries: &[String]) -> Result<String, BranchError> {
        let valid: Vec<&str> = queries
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect();
        if valid.is_empty() {
            warn!("No usable search queries supplied");
            return Ok(NO_VALID_QUERIES.to_string());
        }

        let mut outcomes = Vec::with_capacity(valid.len());
        for (i, query) in valid.iter().enumerate() {
            info!("Searching {}/{}: {query}", i + 1, valid.len());
            let outcome = self.lookup(query).await.map_err(|e| {
                error!("Search for '{query}' failed: {e}");
                e.to_string()
            });
            outcomes.push((query.to_string(), outcome));
        }

        Ok(summarize(&outcomes))
    }
}

fn snippets(answer: &InstantAnswer, max_results: usize) -> String {
    std::iter::once(answer.abstract_text.as_str())
        .chain(
            answer
                .related_topics
                .iter()
                .filter_map(|t| t.text.as_deref()),
        )
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(max_results)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One block per query, failures recorded inline, duplicate blocks dropped.
fn summarize(outcomes: &[(String, Result<String, String>)]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    for (query, outcome) in outcomes {
        let block = match outcome {
            Ok(text) if text.trim().is_empty() => {
                warn!("No results for '{query}'");
                continue;
            }
            Ok(text) => format!("### 关键词：{query}\n{text}\n"),
            Err(e) => format!("### 关键词：{query}\n搜索失败：{e}\n"),
        };
        if !blocks.contains(&block) {
            blocks.push(block);
        }
    }

    if blocks.is_empty() {
        NO_RESULTS.to_string()
    } else {
        info!("Search finished with {} result blocks", blocks.len());
        blocks.join("\n")
    }
}
