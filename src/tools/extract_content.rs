use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use super::{Tool, ToolContext, ToolResult};
use crate::definitions::ToolType;

const DEFAULT_MAX_CHARS: usize = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Elements that never carry article prose.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "svg",
];

/// Downloads pages and pulls out the main article text.
pub struct ExtractWebContentTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl ExtractWebContentTool {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("blogsmith/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_chars: DEFAULT_MAX_CHARS,
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    async fn fetch_article(&self, url: &str) -> Result<String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("URL must start with http:// or https://"));
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {} while downloading {}", status, url));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        let text = if content_type.is_empty() || content_type.contains("html") {
            extract_article_text(&body)
        } else {
            collapse_whitespace(&body)
        };

        Ok(truncate_chars(&text, self.max_chars))
    }
}

#[async_trait]
impl Tool for ExtractWebContentTool {
    fn name(&self) -> &str {
        ToolType::ExtractWebContent.as_str()
    }

    fn description(&self) -> &str {
        "Extracts main article content from a list of blog or article URLs."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "urls": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of blog/article URLs to extract content from."
                }
            },
            "required": ["urls"]
        })
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> Result<ToolResult> {
        let mut urls: Vec<String> = match &params["urls"] {
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Value::String(single) => vec![single.clone()],
            _ => return Err(anyhow!("Missing urls parameter")),
        };
        // Each page is fetched once, in first-mention order.
        let mut seen = HashSet::new();
        urls.retain(|url| seen.insert(url.clone()));

        let fetched =
            futures::future::join_all(urls.iter().map(|url| self.fetch_article(url))).await;

        let mut extracted = Map::new();
        for (url, outcome) in urls.into_iter().zip(fetched) {
            let text = match outcome {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("content extraction failed for {}: {}", url, e);
                    format!("Error extracting content: {}", e)
                }
            };
            extracted.insert(url, Value::String(text));
        }

        Ok(ToolResult::ok(Value::Object(extracted)))
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn strip_element(html: &str, tag: &str) -> String {
    let pattern = format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>|<{tag}\b[^>]*/>");
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(html, " ").into_owned(),
        Err(_) => html.to_string(),
    }
}

fn inner_of<'a>(html: &'a str, tag: &str) -> Option<&'a str> {
    let pattern = format!(r"(?is)<{tag}\b[^>]*>(.*)</{tag}\s*>");
    Regex::new(&pattern)
        .ok()?
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn strip_tags(fragment: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let text = regex(&TAGS, r"(?s)<[^>]+>").replace_all(fragment, " ");
    collapse_whitespace(&html_escape::decode_html_entities(&text))
}

fn collapse_whitespace(text: &str) -> String {
    static SPACE: OnceLock<Regex> = OnceLock::new();
    regex(&SPACE, r"\s+").replace_all(text, " ").trim().to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Main prose of an HTML page: boilerplate removed, the `<article>` (or
/// `<main>`, or `<body>`) region selected, paragraphs joined by blank lines.
pub fn extract_article_text(html: &str) -> String {
    static COMMENTS: OnceLock<Regex> = OnceLock::new();
    static PARAGRAPHS: OnceLock<Regex> = OnceLock::new();

    let mut cleaned = regex(&COMMENTS, r"(?s)<!--.*?-->")
        .replace_all(html, " ")
        .into_owned();
    for tag in BOILERPLATE_TAGS {
        cleaned = strip_element(&cleaned, tag);
    }

    let region = inner_of(&cleaned, "article")
        .or_else(|| inner_of(&cleaned, "main"))
        .or_else(|| inner_of(&cleaned, "body"))
        .unwrap_or(&cleaned);

    let paragraphs: Vec<String> = regex(&PARAGRAPHS, r"(?is)<p\b[^>]*>(.*?)</p\s*>")
        .captures_iter(region)
        .filter_map(|c| c.get(1))
        .map(|m| strip_tags(m.as_str()))
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        strip_tags(region)
    } else {
        paragraphs.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
            <head><title>Ignored</title><style>.x { color: red; }</style></head>
            <body>
                <nav><a href="/">Home</a> <p>Menu paragraph</p></nav>
                <header><p>Site banner</p></header>
                <article>
                    <h1>Robotic Vision</h1>
                    <p>Robots now <b>see</b> in 3D &amp; color.</p>
                    <script>track();</script>
                    <p class="lead">
                        Depth   sensors are
                        cheap.
                    </p>
                </article>
                <footer><p>Copyright</p></footer>
            </body>
        </html>
    "#;

    #[test]
    fn test_extract_prefers_article_paragraphs() {
        let text = extract_article_text(PAGE);
        assert_eq!(
            text,
            "Robots now see in 3D & color.\n\nDepth sensors are cheap."
        );
    }

    #[test]
    fn test_extract_falls_back_to_body_text() {
        let html = "<html><body><div>Just <i>some</i> text</div><!-- hidden --></body></html>";
        assert_eq!(extract_article_text(html), "Just some text");
    }

    #[test]
    fn test_extract_uses_main_when_no_article() {
        let html = "<body><aside><p>Ad</p></aside><main><p>Main copy</p></main><p>Outside</p></body>";
        assert_eq!(extract_article_text(html), "Main copy");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "é".repeat(1200);
        let cut = truncate_chars(&text, 1000);
        assert_eq!(cut.chars().count(), 1000);
    }

    #[tokio::test]
    async fn test_bad_urls_map_to_error_strings() {
        let tool = ExtractWebContentTool::new().unwrap();
        let result = tool
            .execute(json!({"urls": ["ftp://nope", "not a url"]}), &ToolContext::default())
            .await
            .unwrap();

        assert!(result.success);
        let map = result.output.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert!(map["ftp://nope"]
            .as_str()
            .unwrap()
            .starts_with("Error extracting content:"));
    }

    #[tokio::test]
    async fn test_repeated_urls_collapse_to_one_entry() {
        let tool = ExtractWebContentTool::new().unwrap();
        let result = tool
            .execute(
                json!({"urls": ["ftp://same", "not a url", "ftp://same", "ftp://same"]}),
                &ToolContext::default(),
            )
            .await
            .unwrap();

        let map = result.output.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("ftp://same"));
        assert!(map.contains_key("not a url"));
    }

    #[tokio::test]
    async fn test_fetches_each_page_once_and_truncates() {
        use axum::{response::Html, routing::get, Router};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/post",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Html("<html><body><article><p>Smart homes learn your routine.</p></article></body></html>")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/post", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let tool = ExtractWebContentTool::with_timeout(5).unwrap().with_max_chars(11);
        let result = tool
            .execute(
                json!({"urls": [url.clone(), url.clone(), url.clone()]}),
                &ToolContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let map = result.output.as_object().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[url.as_str()], "Smart homes");
    }

    #[tokio::test]
    async fn test_missing_urls_is_an_error() {
        let tool = ExtractWebContentTool::new().unwrap();
        assert!(tool.execute(json!({}), &ToolContext::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_url_list_gives_empty_object() {
        let tool = ExtractWebContentTool::new().unwrap();
        let result = tool
            .execute(json!({"urls": []}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(result.output, json!({}));
    }
}
