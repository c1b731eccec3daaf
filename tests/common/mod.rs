//! 集成测试共用的 stub：搜索后端与抓取器

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use forager::core::{FetchError, RetryPolicy, SearchError};
use forager::research::{
    ContentKind, FetchResult, PageFetcher, Payload, SearchHit, SearchKind, SearchProvider,
};

/// 前 `rate_limited_first` 次调用返回限流，之后返回固定结果
pub struct StubSearch {
    hits: Vec<SearchHit>,
    rate_limited_first: u32,
    calls: AtomicU32,
}

impl StubSearch {
    pub fn new(urls: &[&str]) -> Self {
        Self {
            hits: urls.iter().map(|u| SearchHit::new(*u)).collect(),
            rate_limited_first: 0,
            calls: AtomicU32::new(0),
        }
    }

    pub fn rate_limited_first(mut self, n: u32) -> Self {
        self.rate_limited_first = n;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(
        &self,
        _query: &str,
        max_results: usize,
        _kind: SearchKind,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.rate_limited_first {
            return Err(SearchError::RateLimited);
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

pub enum StubPage {
    Html(String),
    Fail(FetchError),
    Panic,
    Slow(Duration, String),
}

/// 按 URL 返回预设页面，并记录同时进行的最大抓取数
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, StubPage>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: StubPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.page(url, StubPage::Html(format!("<html><body><p>{body}</p></body></html>")))
    }

    pub fn max_observed_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match self.pages.get(url) {
            Some(StubPage::Html(body)) => {
                FetchResult::ok(url, Payload::Text(body.clone()), ContentKind::Html)
            }
            Some(StubPage::Fail(err)) => FetchResult::failed(url, ContentKind::Html, err.clone()),
            Some(StubPage::Panic) => panic!("fetcher exploded on {url}"),
            Some(StubPage::Slow(delay, body)) => {
                tokio::time::sleep(*delay).await;
                FetchResult::ok(url, Payload::Text(body.clone()), ContentKind::Html)
            }
            None => FetchResult::failed(url, ContentKind::Html, FetchError::Http(404)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// 毫秒级退避，测试不必真实等待
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(1),
        Duration::from_millis(4),
    )
}
