//! Producer endpoints: submit a résumé, poll for its result, chat about it.
//!
//! All three answer with `{"status": ..., "message": ...}`. Submission is
//! fire-and-forget: the task ID comes back as soon as the descriptor is queued.

use axum::{
    extract::{Multipart, State},
    Form, Json,
};
use bytes::Bytes;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::task::{FailureRecord, TaskDescriptor, TaskInfo, TaskKind};
use crate::pdf;
use crate::pipeline::llm_tasks::chat_reply;
use crate::state::AppState;
use crate::store::ResultLookup;
use crate::task_id;

/// Uploads above this size are rejected before the handler runs.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl StatusReply {
    fn new(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            task_id: None,
        }
    }

    fn for_task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Submission
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Submission {
    file: Option<Bytes>,
    job_name: String,
    job_description: String,
    more_info: String,
    user_request: String,
}

impl Submission {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut submission = Submission::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => submission.file = Some(field.bytes().await?),
                "job_name" => submission.job_name = field.text().await?,
                "job_description" => submission.job_description = field.text().await?,
                "more_info" => submission.more_info = field.text().await?,
                "user_request" => submission.user_request = field.text().await?,
                other => warn!("Ignoring unexpected form field '{other}'"),
            }
        }
        Ok(submission)
    }
}

/// POST /resume_optimization
pub async fn handle_submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<StatusReply>, AppError> {
    let submission = Submission::read(multipart).await?;
    let pdf_bytes = submission
        .file
        .ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let text = pdf::extract_text(pdf_bytes).await?;

    let task_id = state.ids.generate_task_id();
    let descriptor = TaskDescriptor::new(
        task_id.clone(),
        TaskKind::ResumeOptimization,
        TaskInfo {
            resume_text: pdf::with_current_date(&text, Local::now().date_naive()),
            job_name: submission.job_name,
            job_description: submission.job_description,
            extra_info: submission.more_info,
            user_remarks: submission.user_request,
        },
    );

    if !state.queue.push(&descriptor).await {
        return Err(AppError::Queue(format!("push rejected for task {task_id}")));
    }
    info!(
        "Task {task_id} queued ({}), queue length {}",
        descriptor.text,
        state.queue.length().await
    );

    Ok(Json(StatusReply::new("success", task_id)))
}

// ────────────────────────────────────────────────────────────────────────────
// Polling
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    #[serde(default)]
    pub task_id: String,
}

/// POST /get_resume_optimization_result
/// Never blocks: answers `processing` until a terminal value is stored.
pub async fn handle_get_result(
    State(state): State<AppState>,
    Form(query): Form<ResultQuery>,
) -> Json<StatusReply> {
    let task_id = query.task_id.trim();
    if task_id.is_empty() {
        return Json(StatusReply::new("error", "任务ID不能为空"));
    }
    if !task_id::is_well_formed(task_id) {
        let reply = StatusReply::new("not_found", format!("任务ID不存在: {task_id}"));
        return Json(reply.for_task(task_id));
    }

    let reply = match state.results.get(task_id).await {
        ResultLookup::Ready(value) => match FailureRecord::parse(&value) {
            Some(failure) => {
                warn!("Task {task_id} finished with failure: {}", failure.error);
                StatusReply::new("error", format!("任务处理失败: {}", failure.error))
            }
            None => {
                info!("Result ready for task {task_id}");
                StatusReply::new("success", value)
            }
        },
        ResultLookup::Pending => StatusReply::new("processing", "任务仍在处理中，请稍后重试"),
    };
    Json(reply.for_task(task_id))
}

// ────────────────────────────────────────────────────────────────────────────
// Follow-up chat
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub history_chat_record: String,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub res_opt_record: String,
}

/// POST /resume_optimization_chat
/// Synchronous: calls the LLM in the request and returns its reply.
pub async fn handle_chat(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Json<StatusReply> {
    if form.user_prompt.trim().is_empty() {
        return Json(StatusReply::new("error", "用户提示词不能为空"));
    }

    match chat_reply(
        &state.llm,
        &form.history_chat_record,
        &form.user_prompt,
        &form.res_opt_record,
    )
    .await
    {
        Ok(reply) => Json(StatusReply::new("success", reply)),
        Err(e) => {
            error!("Chat reply failed: {e}");
            Json(StatusReply::new("error", e.to_string()))
        }
    }
}
