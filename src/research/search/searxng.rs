//! SearXNG JSON API
//!
//! GET `{base}/search?q=..&format=json&categories=general|news`；实例需开启 json 输出格式。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::SearchError;
use crate::research::search::{status_error, SearchProvider};
use crate::research::types::{SearchHit, SearchKind};

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

pub struct SearxngSearch {
    client: Client,
    base_url: String,
}

impl SearxngSearch {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for SearxngSearch {
    fn name(&self) -> &str {
        "searxng"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        kind: SearchKind,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let category = match kind {
            SearchKind::Web => "general",
            SearchKind::News => "news",
        };
        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("categories", category)])
            .send()
            .await
            .map_err(|e| SearchError::Failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        let body: SearxngResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::Failed(format!("invalid searxng response: {e}")))?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|r| {
                let mut hit = SearchHit::new(r.url?);
                if let Some(title) = r.title.filter(|t| !t.is_empty()) {
                    hit = hit.with_title(title);
                }
                if let Some(content) = r.content.filter(|c| !c.is_empty()) {
                    hit = hit.with_snippet(content);
                }
                Some(hit)
            })
            .take(max_results)
            .collect())
    }
}
