//! Task Orchestrator: drives one queued résumé task through the pipeline.
//!
//! Per task:
//!   clean ──► extract keywords ──► { knowledge store, résumé web search }
//!   knowledge graph (job name only)
//!   general web search (job name / description / extra info)
//!   ──► join ──► synthesize report ──► persist `report + delimiter + cleaned`
//!
//! The three root branches start together; store and résumé search wait for the
//! keywords, which wait for the cleaned text. Branch failures are replaced by
//! fixed fallbacks here. Only synthesis failure, an unsupported task kind or a
//! panic fails the task, and that writes a `FailureRecord` so pollers get an answer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::models::task::{FailureRecord, TaskDescriptor, TaskKind};
use crate::pipeline::{BranchError, Collaborators, JobPosting, ReportInputs};
use crate::store::{QueueEntry, ResultStore, TaskQueue};

/// Separates the report from the cleaned résumé in a stored result.
pub const RESULT_DELIMITER: &str = "###$$$简历文本$$$###：";

/// Stands in for the cleaned résumé when cleaning fails.
pub const CLEANING_FAILED: &str = "大模型简历清洗失败！暂无不包含用户敏感信息的简历文本。";

/// Knowledge-store keywords used when extraction fails: the seven target categories.
pub const DEFAULT_KEYWORDS: [&str; 7] = [
    "企业类型",
    "岗位类型",
    "岗位所在行业",
    "学术科研经历",
    "学科竞赛经历",
    "社会实践与领导力经历",
    "企业相关实践经历",
];

/// Placeholder for context text that could not be gathered.
pub const NO_CONTENT: &str = "暂无";

const POP_ERROR_BACKOFF: Duration = Duration::from_secs(1);

// ────────────────────────────────────────────────────────────────────────────
// Task lifecycle
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    Received,
    Cleaning,
    ExtractingKeywords,
    GatheringContext,
    Synthesizing,
    Persisted,
    Failed,
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStage::Received => "RECEIVED",
            TaskStage::Cleaning => "CLEANING",
            TaskStage::ExtractingKeywords => "EXTRACTING_KEYWORDS",
            TaskStage::GatheringContext => "GATHERING_CONTEXT",
            TaskStage::Synthesizing => "SYNTHESIZING",
            TaskStage::Persisted => "PERSISTED",
            TaskStage::Failed => "FAILED",
        })
    }
}

/// How one popped entry ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Final result stored under the task ID.
    Persisted { task_id: String },
    /// A `FailureRecord` was written (or attempted) for the task ID.
    Failed { task_id: String, error: String },
    /// The payload could not be decoded; nothing was written.
    Dropped {
        task_id: Option<String>,
        reason: String,
    },
}

fn enter(task_id: &str, stage: TaskStage) {
    info!("Task {task_id} → {stage}");
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Orchestrator {
    queue: Arc<dyn TaskQueue>,
    results: Arc<dyn ResultStore>,
    collaborators: Collaborators,
    pop_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        results: Arc<dyn ResultStore>,
        collaborators: Collaborators,
        pop_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            results,
            collaborators,
            pop_timeout,
        }
    }

    /// Pops and processes tasks one at a time until `shutdown` reads `true`.
    ///
    /// The flag is checked between tasks only, so an in-flight task always
    /// finishes. The bounded pop keeps the check responsive on an idle queue.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!(
            "Worker started (pop timeout {}s, {} queued)",
            self.pop_timeout.as_secs(),
            self.queue.length().await
        );

        while !*shutdown.borrow() {
            let entry = match self.queue.pop(self.pop_timeout).await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    debug!("Queue idle");
                    continue;
                }
                Err(e) => {
                    error!("Queue pop failed: {e}; retrying in {POP_ERROR_BACKOFF:?}");
                    tokio::time::sleep(POP_ERROR_BACKOFF).await;
                    continue;
                }
            };

            // Spawned so a panicking collaborator takes down the task, not the loop.
            let task_id = TaskDescriptor::peek_task_id(entry.as_str());
            let this = self.clone();
            let handle = tokio::spawn(async move { this.process(&entry).await });
            match handle.await {
                Ok(TaskOutcome::Persisted { task_id }) => {
                    info!("Task {task_id} completed");
                }
                Ok(TaskOutcome::Failed { task_id, error }) => {
                    warn!("Task {task_id} failed: {error}");
                }
                Ok(TaskOutcome::Dropped { task_id, reason }) => {
                    warn!(
                        "Dropped task {}: {reason}",
                        task_id.as_deref().unwrap_or("<unknown>")
                    );
                }
                Err(e) => {
                    error!("Task processing aborted: {e}");
                    if let Some(task_id) = task_id {
                        self.fail(&task_id, format!("task panicked: {e}")).await;
                    }
                }
            }
        }

        info!("Worker stopped");
    }

    /// Processes one popped entry end to end and stores its terminal result.
    pub async fn process(&self, entry: &QueueEntry) -> TaskOutcome {
        let task = match TaskDescriptor::decode(entry.as_str()) {
            Ok(task) => task,
            Err(e) => {
                error!("{e}");
                return TaskOutcome::Dropped {
                    task_id: e.task_id.clone(),
                    reason: e.to_string(),
                };
            }
        };
        let task_id = task.task_id.as_str();
        enter(task_id, TaskStage::Received);

        if task.task_type != TaskKind::ResumeOptimization {
            let error = format!(
                "unsupported task type {} ({})",
                task.task_type.code(),
                task.task_type.label()
            );
            return self.fail(task_id, error).await;
        }

        let result = match self.score_resume(&task).await {
            Ok(result) => result,
            Err(e) => return self.fail(task_id, format!("report synthesis failed: {e}")).await,
        };

        if self.results.put(task_id, &result).await {
            enter(task_id, TaskStage::Persisted);
            TaskOutcome::Persisted {
                task_id: task_id.to_string(),
            }
        } else {
            enter(task_id, TaskStage::Failed);
            TaskOutcome::Failed {
                task_id: task_id.to_string(),
                error: "result store rejected the final result".to_string(),
            }
        }
    }

    /// Runs the branch graph and returns the final result string.
    async fn score_resume(&self, task: &TaskDescriptor) -> Result<String, BranchError> {
        let task_id = task.task_id.as_str();
        let info = &task.task_info;

        enter(task_id, TaskStage::Cleaning);
        let resume_chain = async {
            let cleaned = self.cleaned_resume(task_id, &info.resume_text).await;

            enter(task_id, TaskStage::ExtractingKeywords);
            let keywords = self.keywords(task_id, &info.posting(), &cleaned).await;

            enter(task_id, TaskStage::GatheringContext);
            let (store_text, resume_web) = tokio::join!(
                self.store_text(task_id, &keywords),
                self.web_text(task_id, "résumé", &keywords),
            );
            (cleaned, store_text, resume_web)
        };

        let general_queries = [
            info.job_name.clone(),
            info.job_description.clone(),
            info.extra_info.clone(),
        ];
        let ((cleaned, store_text, resume_web), graph_text, general_web) = tokio::join!(
            resume_chain,
            self.graph_text(task_id, &info.job_name),
            self.web_text(task_id, "general", &general_queries),
        );

        enter(task_id, TaskStage::Synthesizing);
        let inputs = ReportInputs {
            cleaned_resume: &cleaned,
            job: format!("{}  {}", info.job_name, info.job_description),
            store_text: &store_text,
            graph_text: &graph_text,
            web_text: format!("{resume_web}###{general_web}"),
            user_remarks: &info.user_remarks,
            extra_info: &info.extra_info,
        };
        let report = self.collaborators.report_writer.write(&inputs).await?;
        info!("Task {task_id}: report generated ({} chars)", report.chars().count());

        Ok(format!("{report}{RESULT_DELIMITER}{cleaned}"))
    }

    async fn fail(&self, task_id: &str, error: String) -> TaskOutcome {
        enter(task_id, TaskStage::Failed);
        error!("Task {task_id} failed: {error}");

        let record = FailureRecord::new(task_id, error.clone());
        match serde_json::to_string(&record) {
            Ok(json) => {
                if !self.results.put(task_id, &json).await {
                    error!("Task {task_id}: could not store failure record");
                }
            }
            Err(e) => error!("Task {task_id}: could not encode failure record: {e}"),
        }

        TaskOutcome::Failed {
            task_id: task_id.to_string(),
            error,
        }
    }

    // ── Branches with fallbacks ────────────────────────────────────────────

    async fn cleaned_resume(&self, task_id: &str, resume: &str) -> String {
        match self.collaborators.cleaner.clean(resume).await {
            Ok(cleaned) => cleaned,
            Err(e) => {
                error!("Task {task_id}: resume cleaning failed: {e}");
                CLEANING_FAILED.to_string()
            }
        }
    }

    async fn keywords(
        &self,
        task_id: &str,
        posting: &JobPosting<'_>,
        cleaned: &str,
    ) -> Vec<String> {
        match self.collaborators.extractor.extract(posting, cleaned).await {
            Ok(keywords) => keywords,
            Err(e) => {
                error!("Task {task_id}: keyword extraction failed, using defaults: {e}");
                DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
            }
        }
    }

    async fn store_text(&self, task_id: &str, keywords: &[String]) -> String {
        match self.collaborators.knowledge_store.search(keywords).await {
            Ok(hits) if hits.is_empty() => NO_CONTENT.to_string(),
            Ok(hits) => {
                debug!("Task {task_id}: {} knowledge store lines", hits.len());
                hits.join("###")
            }
            Err(e) => {
                error!("Task {task_id}: knowledge store search failed: {e}");
                NO_CONTENT.to_string()
            }
        }
    }

    async fn graph_text(&self, task_id: &str, job_name: &str) -> String {
        match self.collaborators.skill_graph.skills_for(job_name).await {
            Ok(skills) if skills.is_empty() => NO_CONTENT.to_string(),
            Ok(skills) => {
                debug!("Task {task_id}: {} graph skills", skills.len());
                skills.join(" ")
            }
            Err(e) => {
                error!("Task {task_id}: knowledge graph lookup failed: {e}");
                NO_CONTENT.to_string()
            }
        }
    }

    async fn web_text(&self, task_id: &str, kind: &str, queries: &[String]) -> String {
        match self.collaborators.web_search.search(queries).await {
            Ok(text) => text,
            Err(e) => {
                error!("Task {task_id}: {kind} web search failed: {e}");
                NO_CONTENT.to_string()
            }
        }
    }
}
