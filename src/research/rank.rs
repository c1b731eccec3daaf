//! 相关性排序：固定大小的重叠切片 + 可插拔的排序器
//!
//! 排序器是纯函数（无副作用）；未配置时流水线保持搜索结果顺序。

use std::collections::HashSet;

use crate::research::types::{Chunk, EvidenceItem};

/// 相关性排序器：按与 query 的相关性重排片段，可同时丢弃不相关片段
pub trait RelevanceRanker: Send + Sync {
    fn rank(&self, chunks: Vec<Chunk>, query: &str) -> Vec<Chunk>;
}

/// 把文本按字符切成长度 `size`、相邻重叠 `overlap` 的片段；最后一片可能更短
pub fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// 对所有成功的证据切片，记录来源下标
pub fn chunk_evidence(items: &[EvidenceItem], size: usize, overlap: usize) -> Vec<Chunk> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_ok())
        .flat_map(|(source, item)| {
            split_chunks(&item.text, size, overlap)
                .into_iter()
                .map(move |text| Chunk { source, text })
        })
        .collect()
}

fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .map(|w| w.to_lowercase())
        .collect()
}

/// 关键词重叠排序：分数为片段与 query 共有的词数，稳定排序（同分保持原顺序）
#[derive(Debug, Default)]
pub struct KeywordRanker {
    /// 只保留前 top_n 个片段；None 表示全部保留
    top_n: Option<usize>,
}

impl KeywordRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    fn score(query_tokens: &HashSet<String>, text: &str) -> usize {
        tokenize_lower(text).intersection(query_tokens).count()
    }
}

impl RelevanceRanker for KeywordRanker {
    fn rank(&self, chunks: Vec<Chunk>, query: &str) -> Vec<Chunk> {
        let query_tokens = tokenize_lower(query);
        let mut scored: Vec<(usize, Chunk)> = chunks
            .into_iter()
            .map(|c| (Self::score(&query_tokens, &c.text), c))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let ranked = scored.into_iter().map(|(_, c)| c);
        match self.top_n {
            Some(n) => ranked.take(n).collect(),
            None => ranked.collect(),
        }
    }
}

/// 按排序后片段中首次出现的位置重排证据；没有片段的证据（失败或空文本）按原顺序排在最后
pub fn order_by_ranked_chunks(items: Vec<EvidenceItem>, ranked: &[Chunk]) -> Vec<EvidenceItem> {
    let mut order: Vec<usize> = Vec::with_capacity(items.len());
    for chunk in ranked {
        if chunk.source < items.len() && !order.contains(&chunk.source) {
            order.push(chunk.source);
        }
    }
    for idx in 0..items.len() {
        if !order.contains(&idx) {
            order.push(idx);
        }
    }

    let mut slots: Vec<Option<EvidenceItem>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}
