//! 研究层：搜索、抓取、正文抽取、相关性排序与并发研究流水线

pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod rank;
pub mod search;
pub mod types;

pub use extract::{truncate_chars, ContentExtractor};
pub use fetch::{build_http_client, HttpFetcher, PageFetcher, DEFAULT_USER_AGENT};
pub use pipeline::{PipelineSettings, ResearchPipeline};
pub use rank::{KeywordRanker, RelevanceRanker};
pub use search::{DuckDuckGoSearch, SearchProvider, SearxngSearch};
pub use types::{
    Chunk, ContentKind, EvidenceItem, EvidenceSet, FetchResult, Payload, SearchHit, SearchKind,
};
