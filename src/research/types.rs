//! 研究流水线的数据类型：SearchHit → FetchResult → EvidenceItem

use serde::{Deserialize, Serialize};

use crate::core::FetchError;

/// 搜索类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Web,
    News,
}

/// Search Provider 返回的一条结果，立即被抓取阶段消费
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

impl SearchHit {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            snippet: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Pdf,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn empty() -> Self {
        Payload::Text(String::new())
    }
}

/// 单个 URL 的一次抓取结果；失败时 error 有值，payload 为空
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub url: String,
    pub payload: Payload,
    pub kind: ContentKind,
    pub error: Option<FetchError>,
}

impl FetchResult {
    pub fn ok(url: impl Into<String>, payload: Payload, kind: ContentKind) -> Self {
        Self {
            url: url.into(),
            payload,
            kind,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, kind: ContentKind, error: FetchError) -> Self {
        Self {
            url: url.into(),
            payload: Payload::empty(),
            kind,
            error: Some(error),
        }
    }
}

/// 研究流水线对外的证据单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceItem {
    pub url: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "error_as_string")]
    pub error: Option<FetchError>,
}

fn error_as_string<S>(error: &Option<FetchError>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => s.serialize_str(&e.to_string()),
        None => s.serialize_none(),
    }
}

impl EvidenceItem {
    pub fn ok(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: FetchError) -> Self {
        Self {
            url: url.into(),
            text: String::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// 用于相关性排序的文本片段，记录来源证据下标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: usize,
    pub text: String,
}

/// 一次研究调用的返回值
///
/// `items` 与尝试抓取的 URL 一一对应：启用排序时按排序器给出的顺序，否则保持搜索结果顺序。
/// `ranked_chunks` 仅在启用排序时存在，是排序后的片段序列，供摘要使用。
#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    pub items: Vec<EvidenceItem>,
    pub ranked_chunks: Option<Vec<Chunk>>,
}

impl EvidenceSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.is_ok()).count()
    }

    /// 供摘要使用的正文：有排序片段时按片段顺序拼接，否则按证据顺序拼接成功项
    pub fn digest_text(&self) -> String {
        match &self.ranked_chunks {
            Some(chunks) => chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            None => self
                .items
                .iter()
                .filter(|i| i.is_ok() && !i.text.is_empty())
                .map(|i| format!("Source: {}\n{}", i.url, i.text))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}
