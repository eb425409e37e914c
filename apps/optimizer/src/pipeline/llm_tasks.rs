//! LLM-backed collaborators: résumé cleaning, keyword extraction, report
//! synthesis, and the follow-up chat used by the HTTP layer.

use async_trait::async_trait;
use tracing::info;

use crate::llm_client::prompts::{
    ASSISTANT_SYSTEM, BARE_OUTPUT_INSTRUCTION, NO_FABRICATION_INSTRUCTION,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::pipeline::prompts::{
    render, CHAT_PROMPT, KEYWORD_EXTRACT_PROMPT, KEYWORD_SEPARATOR, KEYWORD_SOURCE_TEMPLATE,
    REPORT_PROMPT, RESUME_CLEAN_PROMPT,
};
use crate::pipeline::{
    BranchError, JobPosting, KeywordExtractor, ReportInputs, ReportWriter, ResumeCleaner,
};

#[async_trait]
impl ResumeCleaner for LlmClient {
    async fn clean(&self, resume: &str) -> Result<String, BranchError> {
        let prompt = render(
            RESUME_CLEAN_PROMPT,
            &[("bare_output", BARE_OUTPUT_INSTRUCTION), ("resume", resume)],
        );
        let cleaned = self.call_text(&prompt, ASSISTANT_SYSTEM).await?;
        info!("Resume cleaned ({} chars)", cleaned.chars().count());
        Ok(cleaned)
    }
}

#[async_trait]
impl KeywordExtractor for LlmClient {
    async fn extract(
        &self,
        posting: &JobPosting<'_>,
        cleaned_resume: &str,
    ) -> Result<Vec<String>, BranchError> {
        let reply = self
            .call_text(&build_keyword_prompt(posting, cleaned_resume), ASSISTANT_SYSTEM)
            .await?;
        let keywords = parse_keywords(&reply);
        if keywords.is_empty() {
            return Err(BranchError::NoKeywords);
        }
        info!("Extracted {} keywords: {:?}", keywords.len(), keywords);
        Ok(keywords)
    }
}

#[async_trait]
impl ReportWriter for LlmClient {
    async fn write(&self, inputs: &ReportInputs<'_>) -> Result<String, BranchError> {
        let report = self
            .call_text(&build_report_prompt(inputs), ASSISTANT_SYSTEM)
            .await?;
        Ok(report)
    }
}

/// Splits the model's `<#>`-separated reply into trimmed, non-empty phrases.
fn parse_keywords(reply: &str) -> Vec<String> {
    reply
        .split(KEYWORD_SEPARATOR)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn build_keyword_prompt(posting: &JobPosting<'_>, cleaned_resume: &str) -> String {
    let all_text = render(
        KEYWORD_SOURCE_TEMPLATE,
        &[
            ("job_name", posting.job_name),
            ("job_description", posting.job_description),
            ("extra_info", posting.extra_info),
            ("resume", cleaned_resume),
        ],
    );
    render(
        KEYWORD_EXTRACT_PROMPT,
        &[("bare_output", BARE_OUTPUT_INSTRUCTION), ("all_text", &all_text)],
    )
}

fn build_report_prompt(inputs: &ReportInputs<'_>) -> String {
    render(
        REPORT_PROMPT,
        &[
            ("no_fabrication", NO_FABRICATION_INSTRUCTION),
            ("job", &inputs.job),
            ("extra_info", inputs.extra_info),
            ("user_remarks", inputs.user_remarks),
            ("graph_text", inputs.graph_text),
            ("store_text", inputs.store_text),
            ("web_text", &inputs.web_text),
            ("resume", inputs.cleaned_resume),
        ],
    )
}

fn build_chat_prompt(history: &str, user_prompt: &str, report: &str) -> String {
    render(
        CHAT_PROMPT,
        &[
            ("no_fabrication", NO_FABRICATION_INSTRUCTION),
            ("history", history),
            ("report", report),
            ("user_prompt", user_prompt),
        ],
    )
}

/// Answers a follow-up question about a finished report.
pub async fn chat_reply(
    llm: &LlmClient,
    history: &str,
    user_prompt: &str,
    report: &str,
) -> Result<String, LlmError> {
    llm.call_text(&build_chat_prompt(history, user_prompt, report), ASSISTANT_SYSTEM)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords_splits_and_trims() {
        let reply = "国有企业<#> 数据分析师 <#>挑战杯省级一等奖<#>";
        assert_eq!(
            parse_keywords(reply),
            vec!["国有企业", "数据分析师", "挑战杯省级一等奖"]
        );
    }

    #[test]
    fn test_parse_keywords_blank_reply_is_empty() {
        assert!(parse_keywords("  <#> <#>").is_empty());
        assert!(parse_keywords("").is_empty());
    }

    #[test]
    fn test_parse_keywords_without_separator_is_one_phrase() {
        assert_eq!(parse_keywords("互联网大厂实习"), vec!["互联网大厂实习"]);
    }

    #[test]
    fn test_report_prompt_includes_every_input() {
        let inputs = ReportInputs {
            cleaned_resume: "张*，数据分析实习",
            job: "数据分析师  负责报表".to_string(),
            store_text: "【国企】 1. 注重稳定性",
            graph_text: "SQL Python",
            web_text: "暂无###暂无".to_string(),
            user_remarks: "希望突出项目",
            extra_info: "某国企",
        };
        let prompt = build_report_prompt(&inputs);

        for expected in [
            "张*，数据分析实习",
            "数据分析师  负责报表",
            "【国企】 1. 注重稳定性",
            "SQL Python",
            "暂无###暂无",
            "希望突出项目",
            "某国企",
        ] {
            assert!(prompt.contains(expected), "missing {expected}");
        }
        assert!(!prompt.contains("{resume}"));
    }

    #[test]
    fn test_report_prompt_keeps_user_fields_literal() {
        let inputs = ReportInputs {
            cleaned_resume: "张*，数据分析实习",
            job: "岗位 {store_text}".to_string(),
            store_text: "【国企】",
            graph_text: "SQL",
            web_text: String::new(),
            user_remarks: "{resume}",
            extra_info: "",
        };
        let prompt = build_report_prompt(&inputs);
        assert_eq!(prompt.matches("张*，数据分析实习").count(), 1);
        assert_eq!(prompt.matches("【国企】").count(), 1);
        assert!(prompt.contains("##用户备注：{resume}。"));
        assert!(prompt.contains("岗位 {store_text}"));
    }

    #[test]
    fn test_keyword_prompt_keeps_posting_literal() {
        let posting = JobPosting {
            job_name: "{resume}",
            job_description: "{bare_output}",
            extra_info: "",
        };
        let prompt = build_keyword_prompt(&posting, "张*");
        assert!(prompt.contains("岗位名称：{resume}。"));
        assert!(prompt.contains("岗位描述：{bare_output}。"));
        assert_eq!(prompt.matches("张*").count(), 1);
        assert_eq!(prompt.matches(BARE_OUTPUT_INSTRUCTION).count(), 1);
    }

    #[test]
    fn test_chat_prompt_keeps_history_literal() {
        let prompt = build_chat_prompt("用户：{report}", "怎么改？", "总分80");
        assert!(prompt.contains("##历史聊天信息：用户：{report}。"));
        assert_eq!(prompt.matches("总分80").count(), 1);
    }

    #[test]
    fn test_report_prompt_does_not_expand_placeholders_inside_resume() {
        let inputs = ReportInputs {
            cleaned_resume: "模板写法 {graph_text}",
            job: String::new(),
            store_text: "",
            graph_text: "SQL",
            web_text: String::new(),
            user_remarks: "",
            extra_info: "",
        };
        assert!(build_report_prompt(&inputs).ends_with("模板写法 {graph_text}"));
    }
}
