// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One configured feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub name: String,
}

impl FeedSource {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            url: url.to_string(),
            name: name.to_string(),
        }
    }
}

/// One parsed `<item>` / `<entry>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub description: String,
}

/// A RawItem whose link parsed as an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item: RawItem,
    pub hostname: String,
}

/// Transport for raw feed bodies. Parsing happens in `ingest::parser`.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<String>;
    fn name(&self) -> &'static str;
}
