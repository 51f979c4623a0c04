// src/ingest/fetcher.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::ingest::types::{FeedFetcher, FeedSource};

pub const FEED_USER_AGENT: &str = "news-localizer/0.1 (feed reader)";

/// Plain reqwest transport with a hard per-request timeout.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(FEED_USER_AGENT)
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<String> {
        let resp = self
            .client
            .get(&source.url)
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5",
            )
            .send()
            .await
            .with_context(|| format!("GET {}", source.url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("feed {} answered {}", source.name, status);
        }
        resp.text()
            .await
            .with_context(|| format!("reading body of {}", source.url))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
