//! Categorized résumé-advice documents, searched keyword by keyword.
//!
//! Lookup order per keyword:
//! 1. alias table → exact category match
//! 2. keyword appears in a document's category, tags or dimension
//! 3. a "nothing found" line for that keyword

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::pipeline::{BranchError, KnowledgeStore};

const RESULTS_PER_KEYWORD: usize = 2;
const FRAGMENT_MAX_CHARS: usize = 150;
const FALLBACK_PREFIX_CHARS: usize = 200;

const METADATA_PREFIXES: &[&str] = &[
    "tag:",
    "tags:",
    "metadata:",
    "维度:",
    "分类:",
    "标签:",
    "排版样式",
    "项目包装",
    "内容表达优化",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(alias = "分类")]
    pub category: String,
    #[serde(default, alias = "标签")]
    pub tags: String,
    #[serde(default, alias = "维度")]
    pub dimension: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentKnowledgeStore {
    /// Keyword → canonical category name.
    #[serde(default)]
    category_aliases: HashMap<String, String>,
    documents: Vec<Document>,
}

impl DocumentKnowledgeStore {
    pub fn from_json(json: &str) -> Result<Self, BranchError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BranchError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json(&json)?;
        info!(
            "Loaded knowledge store from {} ({} documents, {} aliases)",
            path.display(),
            store.documents.len(),
            store.category_aliases.len()
        );
        Ok(store)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn search_keyword(&self, keyword: &str) -> Vec<String> {
        if let Some(category) = self.category_aliases.get(keyword) {
            let hits = self.by_category(category);
            if !hits.is_empty() {
                debug!("Keyword '{keyword}' matched category alias '{category}'");
                return format_hits(keyword, &hits);
            }
        }

        let hits = self.by_metadata(keyword);
        if !hits.is_empty() {
            debug!("Keyword '{keyword}' matched document metadata");
            return format_hits(keyword, &hits);
        }

        vec![format!("关键词 '{keyword}'：未找到相关描述")]
    }

    fn by_category(&self, category: &str) -> Vec<(String, &str)> {
        self.documents
            .iter()
            .filter(|doc| doc.category == category)
            .map(|doc| (core_content(&doc.text), doc.category.as_str()))
            .filter(|(text, _)| !text.is_empty())
            .take(RESULTS_PER_KEYWORD)
            .collect()
    }

    fn by_metadata(&self, keyword: &str) -> Vec<(String, &str)> {
        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for doc in &self.documents {
            let matches = [&doc.category, &doc.tags, &doc.dimension]
                .iter()
                .any(|field| field.contains(keyword));
            if !matches {
                continue;
            }
            let text = excerpt(&doc.text, keyword);
            if !text.is_empty() && seen.insert(text.clone()) {
                hits.push((text, doc.category.as_str()));
            }
            if hits.len() >= RESULTS_PER_KEYWORD {
                break;
            }
        }
        hits
    }
}

#[async_trait]
impl KnowledgeStore for DocumentKnowledgeStore {
    async fn search(&self, keywords: &[String]) -> Result<Vec<String>, BranchError> {
        Ok(keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .flat_map(|k| self.search_keyword(k))
            .collect())
    }
}

fn format_hits(keyword: &str, hits: &[(String, &str)]) -> Vec<String> {
    let mut lines = vec![format!("【{keyword}】")];
    for (i, (text, category)) in hits.iter().enumerate() {
        if category.is_empty() {
            lines.push(format!("  {}. {text}", i + 1));
        } else {
            lines.push(format!("  {}. [{category}] {text}", i + 1));
        }
    }
    lines
}

/// Document body with metadata lines, short fragments and bracketed notes removed.
fn core_content(document: &str) -> String {
    let kept: Vec<&str> = document
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_metadata_line(line))
        .filter(|line| line.chars().count() >= 10 || line.contains(['、', '，', '。']))
        .collect();

    let joined = collapse_whitespace(&kept.join(" "));
    let joined = strip_enclosed(&joined, '[', ']');
    strip_enclosed(&joined, '{', '}').trim().to_string()
}

fn is_metadata_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    if METADATA_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    let mut chars = lower.chars();
    match chars.next() {
        Some('①' | '②' | '③' | '④' | '⑤') => true,
        Some('一' | '二' | '三' | '四' | '五' | '六' | '七' | '八' | '九' | '十') => {
            chars.next() == Some('、')
        }
        Some(c) if c.is_ascii_digit() => {
            // `<digits>.<digit>` section numbering
            let rest: String = chars.skip_while(|c| c.is_ascii_digit()).take(2).collect();
            let mut rest = rest.chars();
            rest.next() == Some('.') && rest.next().is_some_and(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Sentences mentioning `keyword` (at most two), or the document's opening.
fn excerpt(document: &str, keyword: &str) -> String {
    let core = core_content(document);
    if core.is_empty() {
        return String::new();
    }

    let sentences: Vec<String> = core
        .split(['。', '！', '？', '；', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.contains(keyword))
        .map(|s| clean_fragment(s, FRAGMENT_MAX_CHARS))
        .filter(|s| !s.is_empty())
        .take(2)
        .collect();

    if !sentences.is_empty() {
        return sentences.join(" ");
    }

    let opening: String = core.chars().take(FALLBACK_PREFIX_CHARS).collect();
    clean_fragment(&opening, FRAGMENT_MAX_CHARS)
}

/// Collapses whitespace and truncates to `max_chars`, preferring a `。` boundary.
fn clean_fragment(text: &str, max_chars: usize) -> String {
    let text = collapse_whitespace(text);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text;
    }

    let boundary = chars[..max_chars].iter().rposition(|&c| c == '。');
    match boundary {
        Some(pos) if pos > max_chars / 2 => chars[..=pos].iter().collect(),
        _ => {
            let mut cut: String = chars[..max_chars - 3].iter().collect();
            cut.push_str("...");
            cut
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes every `open ... close` span (shortest match). Unclosed spans are kept.
fn strip_enclosed(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        match rest[start + open.len_utf8()..].find(close) {
            Some(len) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + open.len_utf8() + len + close.len_utf8()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE_JSON: &str = r#"{
        "category_aliases": {
            "国企": "国有企业（央企/大型地方国企）",
            "医药": "医药/生物技术/医疗器械"
        },
        "documents": [
            {
                "text": "分类: 国有企业\n国有企业校招更看重候选人的稳定性与政治素养。\n简历中应突出党员身份、学生干部经历。",
                "分类": "国有企业（央企/大型地方国企）",
                "标签": "稳定 国企",
                "维度": "企业类型"
            },
            {
                "text": "挑战杯是含金量很高的综合类创新创业竞赛。获奖经历应写明级别与个人角色。",
                "category": "综合类/创新创业竞赛",
                "tags": "挑战杯 大创",
                "dimension": "学科竞赛经历"
            },
            {
                "text": "挑战杯的国家级奖项在简历中应放在竞赛经历首位。",
                "category": "综合类/创新创业竞赛",
                "tags": "挑战杯",
                "dimension": "学科竞赛经历"
            },
            {
                "text": "第三条挑战杯相关说明，不应出现在结果中，因为每个关键词最多两条。",
                "category": "综合类/创新创业竞赛",
                "tags": "挑战杯",
                "dimension": "学科竞赛经历"
            }
        ]
    }"#;

    fn store() -> DocumentKnowledgeStore {
        DocumentKnowledgeStore::from_json(STORE_JSON).unwrap()
    }

    #[tokio::test]
    async fn test_alias_maps_to_category_documents() {
        let lines = store().search(&["国企".to_string()]).await.unwrap();
        assert_eq!(lines[0], "【国企】");
        assert!(lines[1].starts_with("  1. [国有企业（央企/大型地方国企）] "));
        assert!(lines[1].contains("稳定性"));
        assert!(!lines[1].contains("分类:"), "metadata lines are dropped");
    }

    #[tokio::test]
    async fn test_metadata_match_extracts_keyword_sentences() {
        let lines = store().search(&["挑战杯".to_string()]).await.unwrap();
        assert_eq!(lines.len(), 3, "header plus two hits");
        assert_eq!(lines[0], "【挑战杯】");
        assert_eq!(
            lines[1],
            "  1. [综合类/创新创业竞赛] 挑战杯是含金量很高的综合类创新创业竞赛"
        );
        assert!(lines[2].starts_with("  2. "));
    }

    #[tokio::test]
    async fn test_alias_without_documents_falls_through_to_not_found() {
        let lines = store().search(&["医药".to_string()]).await.unwrap();
        assert_eq!(lines, vec!["关键词 '医药'：未找到相关描述"]);
    }

    #[tokio::test]
    async fn test_blank_keywords_are_skipped() {
        let lines = store()
            .search(&["  ".to_string(), "志愿者".to_string()])
            .await
            .unwrap();
        assert_eq!(lines, vec!["关键词 '志愿者'：未找到相关描述"]);
    }

    #[tokio::test]
    async fn test_bundled_store_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/knowledge_store.json");
        let store = DocumentKnowledgeStore::load(path).await.unwrap();
        assert!(store.document_count() > 0);

        let lines = store.search(&["央企".to_string()]).await.unwrap();
        assert_eq!(lines[0], "【央企】");
        assert!(lines[1].contains("稳定性"));
    }

    #[test]
    fn test_metadata_line_detection() {
        assert!(is_metadata_line("1.2 背景"));
        assert!(is_metadata_line("② 注意事项"));
        assert!(is_metadata_line("三、项目经历"));
        assert!(is_metadata_line("Tags: a b"));
        assert!(is_metadata_line("排版样式建议"));
        assert!(!is_metadata_line("2023年参加挑战杯"));
        assert!(!is_metadata_line("三等奖获得者"));
    }

    #[test]
    fn test_core_content_strips_brackets_and_short_lines() {
        let doc = "短行\n这是一段足够长的正文内容[内部备注]，包含说明{模板}。\n   ";
        assert_eq!(core_content(doc), "这是一段足够长的正文内容，包含说明。");
    }

    #[test]
    fn test_clean_fragment_truncates_at_sentence_boundary() {
        let long = format!("{}。{}", "甲".repeat(100), "乙".repeat(100));
        let cut = clean_fragment(&long, 150);
        assert_eq!(cut.chars().count(), 101);
        assert!(cut.ends_with('。'));

        let no_boundary = "丙".repeat(200);
        let cut = clean_fragment(&no_boundary, 150);
        assert_eq!(cut.chars().count(), 150);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_strip_enclosed_keeps_unclosed_spans() {
        assert_eq!(strip_enclosed("a[b]c[d", '[', ']'), "ac[d");
        assert_eq!(strip_enclosed("{x}{y}z", '{', '}'), "z");
    }
}
