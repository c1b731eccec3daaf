//! DuckDuckGo HTML 端点
//!
//! POST 表单到 html.duckduckgo.com，用 scraper 解析 `div.result`。该端点没有新闻垂直搜索，
//! News 类别用时间过滤（df=w，最近一周）近似。触发反爬时返回 202 + anomaly 页面，视为限流。

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};

use crate::core::SearchError;
use crate::research::search::{status_error, SearchProvider};
use crate::research::types::{SearchHit, SearchKind};

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoSearch {
    client: Client,
    html_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, DDG_HTML_URL)
    }

    pub fn with_endpoint(client: Client, html_url: impl Into<String>) -> Self {
        Self {
            client,
            html_url: html_url.into(),
        }
    }

    /// 解析结果页；跳过 DuckDuckGo 内部链接与广告
    pub fn parse_html_results(html: &str, max_results: usize) -> Vec<SearchHit> {
        let document = Html::parse_document(html);
        let (Ok(result_selector), Ok(title_selector), Ok(snippet_selector)) = (
            Selector::parse("div.result"),
            Selector::parse("a.result__a"),
            Selector::parse(".result__snippet"),
        ) else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        for element in document.select(&result_selector) {
            if hits.len() >= max_results {
                break;
            }
            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };
            let Some(href) = title_elem.value().attr("href") else {
                continue;
            };
            let Some(url) = resolve_redirect(href) else {
                continue;
            };
            if url.contains("duckduckgo.com") {
                continue;
            }

            let title = title_elem.text().collect::<String>().trim().to_string();
            let mut hit = SearchHit::new(url);
            if !title.is_empty() {
                hit = hit.with_title(title);
            }
            if let Some(snippet) = element.select(&snippet_selector).next() {
                let snippet = snippet.text().collect::<String>().trim().to_string();
                if !snippet.is_empty() {
                    hit = hit.with_snippet(snippet);
                }
            }
            hits.push(hit);
        }
        hits
    }

    fn is_anomaly_page(html: &str) -> bool {
        html.contains("anomaly-modal") || html.contains("Unfortunately, bots use DuckDuckGo too")
    }
}

/// DuckDuckGo 结果链接可能是 `//duckduckgo.com/l/?uddg=<encoded>` 跳转
fn resolve_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = url::Url::parse(&absolute).ok()?;
    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    Some(absolute)
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        kind: SearchKind,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let mut form = HashMap::new();
        form.insert("q", query.to_string());
        form.insert("b", String::new());
        if kind == SearchKind::News {
            form.insert("df", "w".to_string());
        }

        let resp = self
            .client
            .post(&self.html_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SearchError::Failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| SearchError::Failed(e.to_string()))?;
        if status == StatusCode::ACCEPTED || Self::is_anomaly_page(&body) {
            return Err(SearchError::RateLimited);
        }

        Ok(Self::parse_html_results(&body, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS: &str = r#"<html><body>
<div class="result">
  <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FParis&rut=x">Paris - Wikipedia</a>
  <a class="result__snippet">Paris is the capital of France.</a>
</div>
<div class="result">
  <a class="result__a" href="https://duckduckgo.com/y.js?ad=1">Ad</a>
</div>
<div class="result">
  <a class="result__a" href="https://www.insee.fr/en/population">Population of France</a>
</div>
<div class="result">
  <a class="result__a" href="https://example.org/third">Third</a>
</div>
</body></html>"#;

    #[test]
    fn test_parse_resolves_redirects_and_skips_internal() {
        let hits = DuckDuckGoSearch::parse_html_results(RESULTS, 10);
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://en.wikipedia.org/wiki/Paris",
                "https://www.insee.fr/en/population",
                "https://example.org/third",
            ]
        );
        assert_eq!(hits[0].title.as_deref(), Some("Paris - Wikipedia"));
        assert_eq!(hits[0].snippet.as_deref(), Some("Paris is the capital of France."));
    }

    #[test]
    fn test_parse_respects_max_results() {
        assert_eq!(DuckDuckGoSearch::parse_html_results(RESULTS, 1).len(), 1);
    }

    #[tokio::test]
    async fn test_http_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = DuckDuckGoSearch::with_endpoint(Client::new(), server.uri());
        let result = provider.search("paris", 5, SearchKind::Web).await;
        assert_eq!(result, Err(SearchError::RateLimited));
    }

    #[tokio::test]
    async fn test_anomaly_page_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_raw("<div class=\"anomaly-modal\"></div>", "text/html"),
            )
            .mount(&server)
            .await;

        let provider = DuckDuckGoSearch::with_endpoint(Client::new(), server.uri());
        let result = provider.search("paris", 5, SearchKind::News).await;
        assert_eq!(result, Err(SearchError::RateLimited));
    }

    #[tokio::test]
    async fn test_news_search_restricts_to_past_week() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("df=w"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(RESULTS, "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = DuckDuckGoSearch::with_endpoint(Client::new(), server.uri());
        let hits = provider.search("paris", 5, SearchKind::News).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].url, "https://en.wikipedia.org/wiki/Paris");
    }

    #[tokio::test]
    async fn test_web_search_has_no_date_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(RESULTS, "text/html"))
            .mount(&server)
            .await;

        let provider = DuckDuckGoSearch::with_endpoint(Client::new(), server.uri());
        provider.search("paris", 5, SearchKind::Web).await.unwrap();

        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 1);
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("q=paris"));
        assert!(!body.contains("df="));
    }
}
