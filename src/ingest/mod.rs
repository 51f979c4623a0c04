// src/ingest/mod.rs
pub mod fetcher;
pub mod parser;
pub mod types;

use crate::ingest::types::{FeedFetcher, FeedSource, RawItem};
use futures::future::join_all;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[a-z!/][^>]*>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Remove markup tags, keep their text.
pub fn strip_tags(s: &str) -> String {
    RE_TAGS.replace_all(s, " ").to_string()
}

/// Collapse runs of whitespace into one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    RE_WS.replace_all(s, " ").trim().to_string()
}

/// Normalize a markup fragment into plain text:
/// entity decode → strip tags → collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    collapse_whitespace(&strip_tags(&decoded))
}

/// Char-based truncation (never splits a UTF-8 sequence).
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

/// Outcome of fetching every feed registered for one request.
#[derive(Debug, Default)]
pub struct FeedHarvest {
    pub items: Vec<RawItem>,
    pub attempted: usize,
    /// Feeds that returned at least one usable item.
    pub yielded: usize,
}

/// Fetch and parse all feeds concurrently.
///
/// Every feed runs to completion before this returns; a transport error or an
/// unparseable body counts as zero items for that feed only. Items keep feed order,
/// then document order, which the selector relies on for stable tie-breaking.
pub async fn harvest(fetcher: &dyn FeedFetcher, sources: &[FeedSource]) -> FeedHarvest {
    let t0 = std::time::Instant::now();

    let outcomes = join_all(sources.iter().map(|src| async move {
        match fetcher.fetch(src).await {
            Ok(body) => parser::parse_feed(&body),
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = %e,
                    feed = %src.name,
                    fetcher = fetcher.name(),
                    "feed fetch failed"
                );
                counter!("feed_errors_total").increment(1);
                Vec::new()
            }
        }
    }))
    .await;

    let mut harvest = FeedHarvest {
        attempted: sources.len(),
        ..Default::default()
    };
    for (src, mut items) in sources.iter().zip(outcomes) {
        counter!("feeds_fetched_total").increment(1);
        if items.is_empty() {
            tracing::debug!(target: "ingest", feed = %src.name, "feed contributed nothing");
            continue;
        }
        harvest.yielded += 1;
        harvest.items.append(&mut items);
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_harvest_ms").record(ms);
    tracing::info!(
        target: "ingest",
        attempted = harvest.attempted,
        yielded = harvest.yielded,
        items = harvest.items.len(),
        elapsed_ms = ms as u64,
        "feed harvest finished"
    );
    harvest
}
