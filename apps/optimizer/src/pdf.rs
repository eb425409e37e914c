use bytes::Bytes;
use chrono::NaiveDate;
use tracing::{error, info};

use crate::errors::AppError;

/// Extracts the text layer of an uploaded PDF.
///
/// Parsing is CPU-bound and `pdf-extract` can panic on malformed input, so it
/// runs on the blocking pool; a panic is reported as an unreadable file.
pub async fn extract_text(pdf: Bytes) -> Result<String, AppError> {
    let size = pdf.len();
    let extracted = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&pdf).map_err(|e| e.to_string())
    })
    .await;

    let text = match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            error!("PDF parse failed ({size} bytes): {e}");
            return Err(AppError::Validation(format!("PDF文件解析失败: {e}")));
        }
        Err(e) if e.is_panic() => {
            error!("PDF parser panicked ({size} bytes)");
            return Err(AppError::Validation("PDF文件解析失败".to_string()));
        }
        Err(e) => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "PDF extraction task did not finish: {e}"
            )))
        }
    };

    if text.trim().is_empty() {
        return Err(AppError::Validation("无法从PDF中提取文本内容".to_string()));
    }
    info!("Extracted {} chars from {size}-byte PDF", text.chars().count());
    Ok(text)
}

/// Appends the submission date so the model can reason about recency.
pub fn with_current_date(resume_text: &str, today: NaiveDate) -> String {
    format!("{resume_text}当前时间：{}", today.format("%Y-%m-%d"))
}
