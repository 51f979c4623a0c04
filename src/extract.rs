//! Main-text extraction for article pages.
//!
//! The page is fetched once with a browser-like signature; the HTML is searched for the
//! most specific content container available (`<article>`, `<main>`, a content-ish
//! `<div>`, `<body>`, then the raw document) and the first one with real text wins.
//! Any failure yields an empty string: callers fall back to the feed description.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;

use crate::ingest::{clean_text, truncate_chars};

pub const DEFAULT_MAX_CHARS: usize = 8000;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Something that can turn an article URL into plain text.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Up to the configured cap of main text; empty on any failure.
    async fn fetch_text(&self, url: &str) -> String;
}

static RE_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "noscript"]
        .iter()
        .map(|t| Regex::new(&format!(r"(?is)<{t}\b[^>]*>.*?</{t}\s*>")).expect("noise regex"))
        .collect()
});

/// Priority-ordered container selectors.
static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    let content_div = ["article", "content", "post", "entry"]
        .iter()
        .flat_map(|k| [format!(r#"div[id*="{k}"]"#), format!(r#"div[class*="{k}"]"#)])
        .collect::<Vec<_>>()
        .join(", ");
    ["article", "main", content_div.as_str(), "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("container selector"))
        .collect()
});

fn remove_noise(html: &str) -> String {
    RE_NOISE
        .iter()
        .fold(html.to_string(), |acc, re| re.replace_all(&acc, " ").to_string())
}

/// Pure extraction step, exposed for tests and offline use.
pub fn extract_main_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    for selector in CONTAINERS.iter() {
        if let Some(element) = document.select(selector).next() {
            let text = clean_text(&remove_noise(&element.html()));
            if !text.is_empty() {
                return truncate_chars(&text, max_chars);
            }
        }
    }

    truncate_chars(&clean_text(&remove_noise(html)), max_chars)
}

/// reqwest-backed extractor.
#[derive(Clone)]
pub struct HttpArticleExtractor {
    client: reqwest::Client,
    max_chars: usize,
}

impl HttpArticleExtractor {
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .build()
            .context("building article http client")?;
        Ok(Self { client, max_chars })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .context("article request")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("article answered {status}");
        }
        resp.text().await.context("article body")
    }
}

#[async_trait]
impl ArticleSource for HttpArticleExtractor {
    async fn fetch_text(&self, url: &str) -> String {
        match self.fetch_html(url).await {
            Ok(html) => {
                let text = extract_main_text(&html, self.max_chars);
                tracing::debug!(target: "extract", %url, chars = text.chars().count(), "article extracted");
                text
            }
            Err(e) => {
                tracing::warn!(target: "extract", %url, error = %e, "article fetch failed");
                counter!("article_extract_failures_total").increment(1);
                String::new()
            }
        }
    }
}
