//! Research Pipeline：搜索 → 并发抓取与抽取 → 排序 → 证据集合
//!
//! 1. 调用 Search Provider，限流时按 RetryPolicy 指数退避重试，耗尽后上抛 SearchRateLimited；
//! 2. 对每个可用 URL 发起独立的 fetch+extract，最多 `max_in_flight` 个同时进行；
//!    单个失败只体现在自己的 EvidenceItem.error 上，不影响兄弟任务；
//! 3. 全部完成（或 fan-out 截止时间到达，未完成者记为 DeadlineExceeded）后组装结果：
//!    配置了排序器则先切片再排序，否则保持搜索结果顺序，绝不按完成先后排序。
//!
//! 每个任务只写自己的结果槽位，任务之间没有共享可变状态。

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::{AgentError, FetchError, RetryPolicy};
use crate::research::extract::ContentExtractor;
use crate::research::fetch::PageFetcher;
use crate::research::rank::{chunk_evidence, order_by_ranked_chunks, RelevanceRanker};
use crate::research::search::SearchProvider;
use crate::research::types::{EvidenceItem, EvidenceSet, SearchHit, SearchKind};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_in_flight: usize,
    /// 整个 fan-out 阶段的截止时间
    pub fanout_deadline: Duration,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            fanout_deadline: Duration::from_secs(30),
            chunk_size: 1000,
            chunk_overlap: 50,
        }
    }
}

pub struct ResearchPipeline {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContentExtractor,
    ranker: Option<Arc<dyn RelevanceRanker>>,
    retry: RetryPolicy,
    settings: PipelineSettings,
    cancel_token: Option<CancellationToken>,
}

/// 只保留 http(s) URL，去重，最多 `max` 个
///
/// 解析只用于检查 scheme；保留搜索结果里的原始 URL，证据与命中一一可对照。
fn usable_urls(hits: Vec<SearchHit>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter_map(|hit| {
            let raw = hit.url.trim();
            let parsed = url::Url::parse(raw).ok()?;
            matches!(parsed.scheme(), "http" | "https").then(|| raw.to_string())
        })
        .filter(|url| seen.insert(url.clone()))
        .take(max)
        .collect()
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(t) => t.cancelled().await,
        None => std::future::pending().await,
    }
}

impl ResearchPipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            search,
            fetcher,
            extractor,
            ranker: None,
            retry: RetryPolicy::default(),
            settings: PipelineSettings::default(),
            cancel_token: None,
        }
    }

    pub fn with_ranker(mut self, ranker: Arc<dyn RelevanceRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// 执行一次研究调用。返回的 items 与尝试抓取的 URL 一一对应。
    pub async fn research(
        &self,
        query: &str,
        max_results: usize,
        kind: SearchKind,
    ) -> Result<EvidenceSet, AgentError> {
        let search = &self.search;
        let hits = self
            .retry
            .run(|attempt| {
                tracing::debug!(provider = search.name(), attempt, query = %query, "search attempt");
                search.search(query, max_results, kind)
            })
            .await?;

        let targets = usable_urls(hits, max_results);
        tracing::info!(query = %query, ?kind, urls = targets.len(), "search returned");
        if targets.is_empty() {
            return Ok(EvidenceSet::default());
        }

        let items = self.fan_out(&targets).await?;

        let (items, ranked_chunks) = match &self.ranker {
            Some(ranker) => {
                let chunks = chunk_evidence(
                    &items,
                    self.settings.chunk_size,
                    self.settings.chunk_overlap,
                );
                let ranked = ranker.rank(chunks, query);
                (order_by_ranked_chunks(items, &ranked), Some(ranked))
            }
            None => (items, None),
        };

        let evidence = EvidenceSet {
            items,
            ranked_chunks,
        };
        tracing::info!(
            query = %query,
            attempted = evidence.len(),
            succeeded = evidence.succeeded(),
            "research complete"
        );
        Ok(evidence)
    }

    /// 并发抓取；结果按 targets 下标落槽，截止时间到达仍为空的槽位记为 DeadlineExceeded
    async fn fan_out(&self, targets: &[String]) -> Result<Vec<EvidenceItem>, AgentError> {
        let mut slots: Vec<Option<EvidenceItem>> = vec![None; targets.len()];

        let completed = {
            let slots = &mut slots;
            let work = async move {
                let mut results = stream::iter(targets.iter().cloned().enumerate())
                    .map(|(index, url)| async move { (index, self.collect_one(&url).await) })
                    .buffer_unordered(self.settings.max_in_flight.max(1));
                while let Some((index, item)) = results.next().await {
                    slots[index] = Some(item);
                }
            };
            tokio::select! {
                outcome = tokio::time::timeout(self.settings.fanout_deadline, work) => outcome.is_ok(),
                _ = cancelled(self.cancel_token.as_ref()) => return Err(AgentError::Cancelled),
            }
        };

        if !completed {
            tracing::warn!(
                deadline_secs = self.settings.fanout_deadline.as_secs_f64(),
                outstanding = slots.iter().filter(|s| s.is_none()).count(),
                "fan-out deadline reached, abandoning outstanding fetches"
            );
        }

        Ok(slots
            .into_iter()
            .zip(targets)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| EvidenceItem::failed(url, FetchError::DeadlineExceeded))
            })
            .collect())
    }

    /// 单个 URL 的 fetch + extract；任何失败（含 panic）都转为带 error 的 EvidenceItem
    async fn collect_one(&self, url: &str) -> EvidenceItem {
        let work = async {
            let fetched = self.fetcher.fetch(url).await;
            match self.extractor.extract(&fetched) {
                Ok(text) => EvidenceItem::ok(url, text),
                Err(e) => EvidenceItem::failed(url, e),
            }
        };
        let outcome = AssertUnwindSafe(work).catch_unwind().await;
        let item = match outcome {
            Ok(item) => item,
            Err(panic) => EvidenceItem::failed(url, FetchError::Crashed(panic_message(panic))),
        };
        match &item.error {
            None => tracing::debug!(url = %url, chars = item.text.chars().count(), "evidence collected"),
            Some(e) => tracing::debug!(url = %url, error = %e, "evidence failed"),
        }
        item
    }
}
