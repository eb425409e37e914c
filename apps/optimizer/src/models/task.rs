use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which pipeline a queued task asks for. Serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskKind {
    ResumeOptimization,
    ResumeChat,
    InterviewQuestions,
    InterviewChat,
}

impl TaskKind {
    pub fn code(self) -> u8 {
        match self {
            TaskKind::ResumeOptimization => 1,
            TaskKind::ResumeChat => 2,
            TaskKind::InterviewQuestions => 3,
            TaskKind::InterviewChat => 4,
        }
    }

    /// Human-readable label carried in the descriptor's `text` field.
    pub fn label(self) -> &'static str {
        match self {
            TaskKind::ResumeOptimization => "简历打分+优化任务",
            TaskKind::ResumeChat => "简历打分_聊天",
            TaskKind::InterviewQuestions => "面试题目生成",
            TaskKind::InterviewChat => "面试题目生成_聊天",
        }
    }
}

impl TryFrom<u8> for TaskKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TaskKind::ResumeOptimization),
            2 => Ok(TaskKind::ResumeChat),
            3 => Ok(TaskKind::InterviewQuestions),
            4 => Ok(TaskKind::InterviewChat),
            other => Err(format!("unknown task_type {other}")),
        }
    }
}

impl From<TaskKind> for u8 {
    fn from(kind: TaskKind) -> u8 {
        kind.code()
    }
}

/// Request payload for one résumé-optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(rename = "pdf全部文本")]
    pub resume_text: String,
    #[serde(rename = "岗位名称")]
    pub job_name: String,
    #[serde(rename = "岗位描述")]
    pub job_description: String,
    #[serde(rename = "其他信息")]
    pub extra_info: String,
    #[serde(rename = "用户备注")]
    pub user_remarks: String,
}

/// One queued request. Immutable once pushed; the worker only reads from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub task_info: TaskInfo,
    pub text: String,
    pub task_type: TaskKind,
}

#[derive(Debug, Error)]
#[error("malformed task descriptor (task_id: {}): {source}", .task_id.as_deref().unwrap_or("unknown"))]
pub struct DecodeError {
    /// Recovered from the raw payload when the JSON was at least an object with a string `task_id`.
    pub task_id: Option<String>,
    #[source]
    pub source: serde_json::Error,
}

impl TaskDescriptor {
    pub fn new(task_id: String, kind: TaskKind, task_info: TaskInfo) -> Self {
        Self {
            task_id,
            task_info,
            text: kind.label().to_string(),
            task_type: kind,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(|source| DecodeError {
            task_id: recover_task_id(raw),
            source,
        })
    }

    /// Reads just the `task_id` of a raw payload, even when the rest of it
    /// would not decode.
    pub fn peek_task_id(raw: &str) -> Option<String> {
        recover_task_id(raw)
    }
}

fn recover_task_id(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    value
        .get("task_id")
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Terminal marker stored in place of a report when a task cannot complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub task_id: String,
    pub status: String,
    pub error: String,
}

impl FailureRecord {
    pub const STATUS: &'static str = "failed";

    pub fn new(task_id: &str, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: Self::STATUS.to_string(),
            error: error.into(),
        }
    }

    /// Recognises a stored value as a failure marker rather than a report.
    pub fn parse(stored: &str) -> Option<Self> {
        serde_json::from_str::<Self>(stored)
            .ok()
            .filter(|record| record.status == Self::STATUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> TaskInfo {
        TaskInfo {
            resume_text: "张三，电话13800000000".to_string(),
            job_name: "数据分析师".to_string(),
            job_description: "负责数据分析".to_string(),
            extra_info: String::new(),
            user_remarks: String::new(),
        }
    }

    #[test]
    fn test_descriptor_uses_wire_field_names() {
        let descriptor = TaskDescriptor::new(
            "2025010112000000000001".to_string(),
            TaskKind::ResumeOptimization,
            sample_info(),
        );
        let value: serde_json::Value = serde_json::from_str(&descriptor.encode().unwrap()).unwrap();

        assert_eq!(value["task_id"], "2025010112000000000001");
        assert_eq!(value["task_type"], 1);
        assert_eq!(value["text"], "简历打分+优化任务");
        assert_eq!(value["task_info"]["岗位名称"], "数据分析师");
        assert_eq!(value["task_info"]["pdf全部文本"], "张三，电话13800000000");
        assert!(value["task_info"].get("job_name").is_none());
    }

    #[test]
    fn test_decode_accepts_producer_payload() {
        let raw = r#"{
            "task_id": "20250101120000000001",
            "task_info": {
                "pdf全部文本": "张三，电话123",
                "岗位名称": "数据分析师",
                "岗位描述": "...",
                "其他信息": "",
                "用户备注": ""
            },
            "text": "简历打分+优化任务",
            "task_type": 1
        }"#;
        let descriptor = TaskDescriptor::decode(raw).unwrap();
        assert_eq!(descriptor.task_id, "20250101120000000001");
        assert_eq!(descriptor.task_type, TaskKind::ResumeOptimization);
        assert_eq!(descriptor.task_info.job_name, "数据分析师");
    }

    #[test]
    fn test_decode_missing_field_recovers_task_id() {
        let raw = r#"{"task_id": "abc", "task_info": {"岗位名称": "x"}, "text": "", "task_type": 1}"#;
        let err = TaskDescriptor::decode(raw).unwrap_err();
        assert_eq!(err.task_id.as_deref(), Some("abc"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_decode_garbage_has_no_task_id() {
        let err = TaskDescriptor::decode("not json at all").unwrap_err();
        assert!(err.task_id.is_none());
        assert!(err.to_string().contains("unknown"));
    }

    #[test]
    fn test_decode_rejects_unknown_task_type() {
        let raw = r#"{
            "task_id": "t1",
            "task_info": {"pdf全部文本": "", "岗位名称": "", "岗位描述": "", "其他信息": "", "用户备注": ""},
            "text": "",
            "task_type": 9
        }"#;
        let err = TaskDescriptor::decode(raw).unwrap_err();
        assert_eq!(err.task_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_task_kind_codes_and_labels() {
        for code in 1..=4u8 {
            let kind = TaskKind::try_from(code).unwrap();
            assert_eq!(kind.code(), code);
            assert!(!kind.label().is_empty());
        }
        assert!(TaskKind::try_from(0).is_err());
    }

    #[test]
    fn test_failure_record_is_recognised() {
        let record = FailureRecord::new("t9", "synthesis failed");
        let stored = serde_json::to_string(&record).unwrap();
        assert_eq!(FailureRecord::parse(&stored), Some(record));
    }

    #[test]
    fn test_report_text_is_not_a_failure_record() {
        assert!(FailureRecord::parse("评分：85###$$$简历文本$$$###：张*").is_none());
        assert!(FailureRecord::parse(r#"{"task_id":"t","status":"done","error":""}"#).is_none());
    }
}
