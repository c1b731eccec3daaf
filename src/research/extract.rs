//! Content Extractor：把抓取到的负载转为规范化纯文本
//!
//! - HTML：丢弃 script/style/nav/header/footer 等非正文结构，按块级元素换行展开为可见文本；
//!   结构化抽取结果为空时回退到 html2text；
//! - PDF：按页序拼接每页文本；
//! - 其它：视为纯文本（若内容看起来像 HTML 则走 HTML 路径）。
//!
//! 所有路径都去掉空行，并在返回前执行同一截断策略。截断是简单的前缀截取，会丢失信息。

use std::panic::{catch_unwind, AssertUnwindSafe};

use ego_tree::iter::Edge;
use scraper::{Html, Node};

use crate::core::FetchError;
use crate::research::types::{ContentKind, FetchResult, Payload};

/// 不属于正文的结构元素，整个子树跳过
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "nav", "header", "footer", "aside",
    "form", "iframe", "svg", "canvas", "button",
];

/// 块级元素：开闭处换行
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table", "td", "th",
    "tr", "ul",
];

/// 按字符截取前 `max_chars` 个字符；已不超过上限时原样返回，因此重复截断是幂等的
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// 逐行压缩空白并去掉空行
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 嗅探时只看开头这么多字符
const SNIFF_CHARS: usize = 512;

/// 出现任一标签即视为 HTML 文档或片段
const HTML_MARKERS: &[&str] = &[
    "<!doctype html", "<html", "<head", "<body", "<title", "<meta", "<div", "<p>", "<p ",
];

/// 没有 Content-Type 提示时嗅探正文是否为 HTML：以 `<` 开头且开头一段里出现常见 HTML 标签
pub fn sniff_html(text: &str) -> bool {
    let head = text
        .trim_start()
        .chars()
        .take(SNIFF_CHARS)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with('<') && HTML_MARKERS.iter().any(|marker| head.contains(marker))
}

/// 去掉非正文结构后，把 DOM 展开为按行分隔的可见文本
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 4);
    let mut skipping = 0usize;

    for edge in document.tree.root().traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(el) if skipping > 0 || SKIPPED_ELEMENTS.contains(&el.name()) => {
                    skipping += 1;
                }
                Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push('\n'),
                Node::Text(text) if skipping == 0 => out.push_str(&text.text),
                _ => {}
            },
            Edge::Close(node) => match node.value() {
                Node::Element(_) if skipping > 0 => skipping -= 1,
                Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push('\n'),
                _ => {}
            },
        }
    }

    let text = normalize_lines(&out);
    if !text.is_empty() {
        return text;
    }
    match html2text::from_read(html.as_bytes(), 120) {
        Ok(fallback) => normalize_lines(&fallback),
        Err(_) => String::new(),
    }
}

/// 按页序拼接 PDF 每页文本；pdf 解析库在畸形输入上可能 panic，这里就地捕获
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, FetchError> {
    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| FetchError::Parse("pdf extractor panicked".to_string()))?
    .map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(normalize_lines(&pages.join("\n")))
}

/// 抽取器：持有截断上限
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    max_chars: usize,
}

impl ContentExtractor {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// 抽取并截断；抓取本身已失败时原样返回其错误
    pub fn extract(&self, fetched: &FetchResult) -> Result<String, FetchError> {
        if let Some(err) = &fetched.error {
            return Err(err.clone());
        }
        let text = match (fetched.kind, &fetched.payload) {
            (ContentKind::Pdf, Payload::Binary(bytes)) => pdf_to_text(bytes)?,
            (ContentKind::Pdf, Payload::Text(text)) => pdf_to_text(text.as_bytes())?,
            (ContentKind::Html, Payload::Text(html)) => html_to_text(html),
            (ContentKind::Html, Payload::Binary(bytes)) => {
                html_to_text(&String::from_utf8_lossy(bytes))
            }
            (ContentKind::Other, Payload::Text(text)) if sniff_html(text) => {
                html_to_text(text)
            }
            (ContentKind::Other, Payload::Text(text)) => normalize_lines(text),
            (ContentKind::Other, Payload::Binary(bytes)) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| FetchError::Parse("unsupported binary content".to_string()))?;
                normalize_lines(text)
            }
        };
        Ok(truncate_chars(&text, self.max_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>France</title><style>body { color: red; }</style></head>
<body>
  <header>Site Header</header>
  <nav><a href="/">Home</a> <a href="/about">About</a></nav>
  <main>
    <h1>France</h1>
    <p>The capital of France is <b>Paris</b>.</p>

    <p>Population:   68000000</p>
    <script>var tracking = "should not appear";</script>
  </main>
  <footer>Copyright</footer>
</body>
</html>"#;

    #[test]
    fn test_html_strips_structural_elements() {
        let text = html_to_text(PAGE);
        assert!(text.contains("The capital of France is Paris."));
        assert!(text.contains("Population: 68000000"));
        assert!(!text.contains("Site Header"));
        assert!(!text.contains("Home"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_html_has_no_blank_lines() {
        let text = html_to_text(PAGE);
        assert!(text.lines().all(|l| !l.trim().is_empty()));
        assert_eq!(text.lines().next(), Some("France"));
    }

    #[test]
    fn test_truncate_is_prefix_and_idempotent() {
        let text = "héllo wörld";
        let once = truncate_chars(text, 5);
        assert_eq!(once, "héllo");
        assert_eq!(truncate_chars(&once, 5), once);
        assert_eq!(truncate_chars(text, 100), text);
    }

    #[test]
    fn test_extract_below_cap_is_unchanged() {
        let extractor = ContentExtractor::new(1000);
        let fetched = FetchResult::ok(
            "https://example.com/a.txt",
            Payload::Text("line one\nline two".to_string()),
            ContentKind::Other,
        );
        assert_eq!(extractor.extract(&fetched).unwrap(), "line one\nline two");
    }

    #[test]
    fn test_extract_applies_cap_to_html() {
        let extractor = ContentExtractor::new(6);
        let fetched = FetchResult::ok(
            "https://example.com",
            Payload::Text(PAGE.to_string()),
            ContentKind::Html,
        );
        assert_eq!(extractor.extract(&fetched).unwrap(), "France");
    }

    #[test]
    fn test_extract_passes_through_fetch_error() {
        let extractor = ContentExtractor::new(100);
        let fetched =
            FetchResult::failed("https://example.com", ContentKind::Html, FetchError::Http(404));
        assert_eq!(extractor.extract(&fetched), Err(FetchError::Http(404)));
    }

    #[test]
    fn test_invalid_pdf_is_parse_failure() {
        let extractor = ContentExtractor::new(100);
        let fetched = FetchResult::ok(
            "https://example.com/report.pdf",
            Payload::Binary(b"not a pdf at all".to_vec()),
            ContentKind::Pdf,
        );
        let err = extractor.extract(&fetched).unwrap_err();
        assert!(err.is_parse_failure());
    }

    #[test]
    fn test_plain_text_html_detection() {
        assert!(sniff_html("<!DOCTYPE html><html></html>"));
        assert!(sniff_html("  <div class=\"x\"><p>fragment</p></div>"));
        assert!(!sniff_html("just some words"));
        assert!(!sniff_html("a < b and b > c"));
        assert!(!sniff_html("<note><to>xml, not html</to></note>"));
    }

    const TWO_PAGE_PDF: &[u8] = include_bytes!("../../tests/fixtures/two_pages.pdf");

    #[test]
    fn test_pdf_pages_joined_in_order() {
        let extractor = ContentExtractor::new(1500);
        let fetched = FetchResult::ok(
            "https://example.com/report.pdf",
            Payload::Binary(TWO_PAGE_PDF.to_vec()),
            ContentKind::Pdf,
        );
        let text = extractor.extract(&fetched).unwrap();
        let first = text.find("alpha").expect("page one text");
        let second = text.find("beta").expect("page two text");
        assert!(first < second, "pages out of order: {text:?}");
        assert!(!text.lines().any(|line| line.trim().is_empty()));
    }

    #[test]
    fn test_extract_applies_cap_to_pdf() {
        let full = pdf_to_text(TWO_PAGE_PDF).unwrap();
        assert!(full.chars().count() > 5);

        let fetched = FetchResult::ok(
            "https://example.com/report.pdf",
            Payload::Binary(TWO_PAGE_PDF.to_vec()),
            ContentKind::Pdf,
        );
        let capped = ContentExtractor::new(5).extract(&fetched).unwrap();
        assert_eq!(capped.chars().count(), 5);
        assert_eq!(capped, truncate_chars(&full, 5));
    }
}
