//! Fetcher：抓取单个 URL 的原始内容
//!
//! 连接超时与总超时由注入的 reqwest Client 决定；超时、网络错误与非 2xx 状态都写入
//! FetchResult.error，从不向流水线外抛出。内容类别先看 URL 后缀（.pdf），其次看 Content-Type。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;

use crate::core::{AgentError, FetchError};
use crate::research::types::{ContentKind, FetchResult, Payload};

/// 默认使用现代浏览器 UA，避免被站点识别为爬虫
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// 构建共享 HTTP 客户端（连接池在所有抓取任务之间复用）
pub fn build_http_client(
    connect_timeout: Duration,
    timeout: Duration,
    user_agent: &str,
) -> Result<Client, AgentError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .user_agent(user_agent)
        .default_headers(headers)
        .build()
        .map_err(|e| AgentError::ConfigError(format!("http client: {e}")))
}

/// 按 URL 路径后缀判断内容类别：`.pdf` 为 PDF，其余先当作 HTML/文本
pub fn content_kind_for_url(url: &str) -> ContentKind {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());
    if path.ends_with(".pdf") {
        ContentKind::Pdf
    } else {
        ContentKind::Html
    }
}

fn content_kind_for_header(content_type: Option<&str>) -> Option<ContentKind> {
    let ct = content_type?.to_lowercase();
    if ct.starts_with("application/pdf") {
        Some(ContentKind::Pdf)
    } else if ct.contains("html") {
        Some(ContentKind::Html)
    } else {
        Some(ContentKind::Other)
    }
}

fn classify(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = err.status() {
        FetchError::Http(status.as_u16())
    } else {
        FetchError::Network(err.to_string())
    }
}

/// 抓取抽象：流水线只依赖它，便于测试替换
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let url_kind = content_kind_for_url(url);
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "fetch request failed");
                return FetchResult::failed(url, url_kind, classify(&e));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            return FetchResult::failed(url, url_kind, FetchError::Http(status.as_u16()));
        }

        let header_kind = content_kind_for_header(
            resp.headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );
        let kind = match (url_kind, header_kind) {
            (ContentKind::Pdf, _) | (_, Some(ContentKind::Pdf)) => ContentKind::Pdf,
            (_, Some(kind)) => kind,
            (kind, None) => kind,
        };

        let payload = if kind == ContentKind::Pdf {
            match resp.bytes().await {
                Ok(bytes) => Payload::Binary(bytes.to_vec()),
                Err(e) => return FetchResult::failed(url, kind, classify(&e)),
            }
        } else {
            match resp.text().await {
                Ok(body) => Payload::Text(
                    body.strip_prefix('\u{FEFF}')
                        .map(str::to_string)
                        .unwrap_or(body),
                ),
                Err(e) => return FetchResult::failed(url, kind, classify(&e)),
            }
        };

        FetchResult::ok(url, payload, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(
            build_http_client(Duration::from_secs(2), timeout, DEFAULT_USER_AGENT).unwrap(),
        )
    }

    #[test]
    fn test_kind_from_url_suffix() {
        assert_eq!(content_kind_for_url("https://a.org/paper.PDF"), ContentKind::Pdf);
        assert_eq!(content_kind_for_url("https://a.org/paper.pdf?dl=1"), ContentKind::Pdf);
        assert_eq!(content_kind_for_url("https://a.org/pdf-guide"), ContentKind::Html);
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "\u{FEFF}<html><body><p>Hello</p></body></html>",
                    "text/html",
                ),
            )
            .mount(&server)
            .await;

        let url = format!("{}/page", server.uri());
        let result = fetcher(Duration::from_secs(5)).fetch(&url).await;
        assert!(result.error.is_none());
        assert_eq!(result.kind, ContentKind::Html);
        match result.payload {
            Payload::Text(body) => assert!(body.starts_with("<html>")),
            other => panic!("Expected text payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_captured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/down", server.uri()))
            .await;
        assert_eq!(result.error, Some(FetchError::Http(503)));
        assert_eq!(result.payload, Payload::empty());
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_captured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let result = fetcher(Duration::from_millis(100))
            .fetch(&format!("{}/slow", server.uri()))
            .await;
        assert_eq!(result.error, Some(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_pdf_content_type_without_suffix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
            )
            .mount(&server)
            .await;

        let result = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/download?id=7", server.uri()))
            .await;
        assert_eq!(result.kind, ContentKind::Pdf);
        assert_eq!(result.payload, Payload::Binary(b"%PDF-1.4".to_vec()));
    }
}
