//! Search Provider：给定查询返回候选 URL
//!
//! 限流以 `SearchError::RateLimited` 区分，由 Research Pipeline 按 RetryPolicy 重试；其它错误立即上抛。

pub mod duckduckgo;
pub mod searxng;

use async_trait::async_trait;

use crate::core::SearchError;
use crate::research::types::{SearchHit, SearchKind};

pub use duckduckgo::DuckDuckGoSearch;
pub use searxng::SearxngSearch;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        kind: SearchKind,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

/// 把 HTTP 状态映射为搜索错误：429 视为限流
pub(crate) fn status_error(status: reqwest::StatusCode) -> SearchError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        SearchError::RateLimited
    } else {
        SearchError::Failed(format!("HTTP {status}"))
    }
}
