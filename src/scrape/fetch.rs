// src/scrape/fetch.rs
//! Outbound HTTP: listing fetches, article-body fetches, and the reduction of
//! article HTML to bounded plain text.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Sentinel body used whenever an article's content cannot be fetched or
/// reduces to nothing. Ingestion continues with this degraded content.
pub const CONTENT_UNAVAILABLE: &str = "Content not available";

/// Plain-text cap for stored article bodies.
pub const MAX_CONTENT_CHARS: usize = 5000;

const TRUNCATION_MARKER: &str = "...";

/// Transport-layer failure. Carries the URL so callers can report which site
/// misbehaved without re-threading it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Seam for everything that pulls pages off the network. The pipeline only
/// ever sees this trait, so tests swap in canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the raw body for `url`. Any non-success response is a failure;
    /// retry policy, if any, belongs to the caller.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Production fetcher: one shared reqwest client carrying the crawler's
/// identity header and bounded timeouts so a slow site cannot stall a run.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        resp.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: e,
        })
    }
}

/// Reduce article HTML to bounded plain text: drop script/style blocks, strip
/// the remaining markup, decode entities, collapse whitespace, cap the length.
pub fn reduce_to_text(html: &str) -> String {
    static RE_SCRIPT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script regex"));
    static RE_STYLE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style regex"));
    static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

    let no_script = RE_SCRIPT.replace_all(html, " ");
    let no_style = RE_STYLE.replace_all(&no_script, " ");
    let no_tags = RE_TAG.replace_all(&no_style, " ");
    let decoded = html_escape::decode_html_entities(no_tags.as_ref());
    let collapsed = RE_WS.replace_all(decoded.as_ref(), " ");
    let text = collapsed.trim();

    if text.is_empty() {
        return CONTENT_UNAVAILABLE.to_string();
    }
    if text.chars().count() > MAX_CONTENT_CHARS {
        let mut out: String = text.chars().take(MAX_CONTENT_CHARS).collect();
        out.push_str(TRUNCATION_MARKER);
        return out;
    }
    text.to_string()
}

/// Fetch an article page and reduce it to plain text. Failures degrade to the
/// sentinel body; the source's remaining candidates still get processed.
pub async fn fetch_article_text(fetcher: &dyn PageFetcher, url: &str) -> String {
    match fetcher.fetch(url).await {
        Ok(html) => reduce_to_text(&html),
        Err(e) => {
            tracing::warn!(error = %e, url, "article content fetch failed");
            CONTENT_UNAVAILABLE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_strips_scripts_styles_and_tags() {
        let html = r#"
            <html><head><style>body { color: red; }</style>
            <script>var tracking = "evil";</script></head>
            <body><h1>Court ruling</h1><p>The Federal Court held that &amp; costs follow.</p></body></html>
        "#;
        let out = reduce_to_text(html);
        assert_eq!(out, "Court ruling The Federal Court held that & costs follow.");
        assert!(!out.contains("tracking"));
        assert!(!out.contains("color"));
    }

    #[test]
    fn reduce_caps_length_with_marker() {
        let html = format!("<p>{}</p>", "a".repeat(MAX_CONTENT_CHARS + 500));
        let out = reduce_to_text(&html);
        assert_eq!(out.chars().count(), MAX_CONTENT_CHARS + TRUNCATION_MARKER.len());
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn reduce_of_empty_markup_yields_sentinel() {
        assert_eq!(reduce_to_text("<div><span></span></div>"), CONTENT_UNAVAILABLE);
    }
}
