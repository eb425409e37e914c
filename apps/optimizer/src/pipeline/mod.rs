// Résumé scoring pipeline.
// Collaborator traits live here; the worker that drives them is in orchestrator.rs.
// All LLM calls go through llm_client; the LlmClient impls are in llm_tasks.rs.

pub mod knowledge_store;
pub mod llm_tasks;
pub mod orchestrator;
pub mod prompts;
pub mod skill_graph;
pub mod web_search;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::models::task::TaskInfo;

/// A collaborator call failed. The orchestrator decides what to substitute.
#[derive(Debug, Error)]
pub enum BranchError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("LLM returned no usable keywords")]
    NoKeywords,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot parse error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Search request failed: {0}")]
    Search(#[from] reqwest::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// The job-side fields of a task, without the résumé text.
#[derive(Debug, Clone, Copy)]
pub struct JobPosting<'a> {
    pub job_name: &'a str,
    pub job_description: &'a str,
    pub extra_info: &'a str,
}

impl TaskInfo {
    pub fn posting(&self) -> JobPosting<'_> {
        JobPosting {
            job_name: &self.job_name,
            job_description: &self.job_description,
            extra_info: &self.extra_info,
        }
    }
}

/// Everything the report writer sees.
#[derive(Debug, Clone)]
pub struct ReportInputs<'a> {
    pub cleaned_resume: &'a str,
    /// Job name and description joined with two spaces.
    pub job: String,
    pub store_text: &'a str,
    pub graph_text: &'a str,
    /// Résumé-related and general web results joined with `###`.
    pub web_text: String,
    pub user_remarks: &'a str,
    pub extra_info: &'a str,
}

/// Strips personal details from raw résumé text.
#[async_trait]
pub trait ResumeCleaner: Send + Sync {
    async fn clean(&self, resume: &str) -> Result<String, BranchError>;
}

/// Derives ordered knowledge-store keywords from the posting and the cleaned résumé.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract(
        &self,
        posting: &JobPosting<'_>,
        cleaned_resume: &str,
    ) -> Result<Vec<String>, BranchError>;
}

/// Skill terms associated with a job title, most relevant first.
#[async_trait]
pub trait SkillGraph: Send + Sync {
    async fn skills_for(&self, job_name: &str) -> Result<Vec<String>, BranchError>;
}

/// Categorized résumé-advice documents searched by keyword.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn search(&self, keywords: &[String]) -> Result<Vec<String>, BranchError>;
}

/// External search over a batch of queries, summarized as one text block.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, queries: &[String]) -> Result<String, BranchError>;
}

/// Produces the scoring / optimization report.
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write(&self, inputs: &ReportInputs<'_>) -> Result<String, BranchError>;
}

/// The collaborators one worker drives.
#[derive(Clone)]
pub struct Collaborators {
    pub cleaner: Arc<dyn ResumeCleaner>,
    pub extractor: Arc<dyn KeywordExtractor>,
    pub skill_graph: Arc<dyn SkillGraph>,
    pub knowledge_store: Arc<dyn KnowledgeStore>,
    pub web_search: Arc<dyn WebSearch>,
    pub report_writer: Arc<dyn ReportWriter>,
}
