//! # Candidate selection
//!
//! Turns the union of all feed items into an ordered, diverse shortlist:
//!
//! - items whose link is not an absolute http(s) URL are dropped,
//! - the rest are stable-sorted newest first (ties keep encounter order),
//! - a greedy walk admits an item only while its hostname is under `per_host_cap`,
//! - exact-link repeats and near-identical headlines are skipped,
//! - the walk stops at `overfetch_factor × count`.
//!
//! Dedup only ever removes items, so the ordering and per-host guarantees hold with
//! or without it.

use metrics::counter;
use std::collections::{HashMap, HashSet};
use url::Url;

use crate::ingest::types::{Candidate, RawItem};

/// Knobs for the selection walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    pub per_host_cap: usize,
    pub overfetch_factor: usize,
    /// Normalized Levenshtein similarity at or above which two titles are the same story.
    /// `None` disables near-duplicate suppression.
    pub title_similarity: Option<f64>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            per_host_cap: 2,
            overfetch_factor: 2,
            title_similarity: Some(0.92),
        }
    }
}

impl SelectionPolicy {
    /// Upper bound on how many candidates a request for `count` articles receives.
    pub fn limit_for(&self, count: usize) -> usize {
        count.saturating_mul(self.overfetch_factor.max(1)).max(count)
    }
}

/// Absolute http(s) URL with a host, or `None`.
pub fn hostname_of(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_ascii_lowercase())
}

fn normalize_title(t: &str) -> String {
    t.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Select candidates for a request of `count` articles.
pub fn select_candidates(
    items: Vec<RawItem>,
    count: usize,
    policy: &SelectionPolicy,
) -> Vec<Candidate> {
    let total = items.len();
    let mut pool: Vec<Candidate> = items
        .into_iter()
        .filter_map(|item| {
            let hostname = hostname_of(&item.link)?;
            Some(Candidate { item, hostname })
        })
        .collect();
    let invalid = total - pool.len();

    // `sort_by` is stable: equal timestamps keep feed/document order.
    pool.sort_by(|a, b| b.item.published_at.cmp(&a.item.published_at));

    let limit = policy.limit_for(count);
    let cap = policy.per_host_cap.max(1);
    let mut per_host: HashMap<String, usize> = HashMap::new();
    let mut seen_links: HashSet<String> = HashSet::new();
    let mut seen_titles: Vec<String> = Vec::new();
    let mut out = Vec::with_capacity(limit.min(pool.len()));
    let mut duplicates = 0usize;

    for cand in pool {
        if out.len() >= limit {
            break;
        }
        let used = per_host.get(&cand.hostname).copied().unwrap_or(0);
        if used >= cap {
            continue;
        }
        if seen_links.contains(cand.item.link.trim()) {
            duplicates += 1;
            continue;
        }
        let norm = normalize_title(&cand.item.title);
        if let Some(threshold) = policy.title_similarity {
            let near_dup = seen_titles
                .iter()
                .any(|t| strsim::normalized_levenshtein(t, &norm) >= threshold);
            if near_dup {
                duplicates += 1;
                continue;
            }
        }

        per_host.insert(cand.hostname.clone(), used + 1);
        seen_links.insert(cand.item.link.trim().to_string());
        seen_titles.push(norm);
        out.push(cand);
    }

    tracing::debug!(
        target: "select",
        total,
        invalid,
        duplicates,
        selected = out.len(),
        limit,
        "candidate selection"
    );
    counter!("candidates_selected_total").increment(out.len() as u64);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(title: &str, link: &str, minute: u32) -> RawItem {
        RawItem {
            title: title.into(),
            link: link.into(),
            published_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap(),
            description: String::new(),
        }
    }

    #[test]
    fn hostname_requires_absolute_http_url() {
        assert_eq!(
            hostname_of("https://News.Example.com/a").as_deref(),
            Some("news.example.com")
        );
        assert!(hostname_of("/relative/path").is_none());
        assert!(hostname_of("mailto:desk@example.com").is_none());
        assert!(hostname_of("not a url").is_none());
    }

    #[test]
    fn newest_first_and_capped_per_host() {
        let items = vec![
            item("a1 story", "https://a.com/1", 1),
            item("a2 other", "https://a.com/2", 5),
            item("a3 third", "https://a.com/3", 9),
            item("b1 bravo", "https://b.com/1", 3),
        ];
        let out = select_candidates(items, 3, &SelectionPolicy::default());
        let links: Vec<_> = out.iter().map(|c| c.item.link.as_str()).collect();
        assert_eq!(links, vec!["https://a.com/3", "https://a.com/2", "https://b.com/1"]);
    }

    #[test]
    fn ties_keep_encounter_order() {
        let items = vec![
            item("first tie", "https://a.com/1", 7),
            item("second tie", "https://b.com/1", 7),
            item("third tie", "https://c.com/1", 7),
        ];
        let out = select_candidates(items, 3, &SelectionPolicy::default());
        let titles: Vec<_> = out.iter().map(|c| c.item.title.as_str()).collect();
        assert_eq!(titles, vec!["first tie", "second tie", "third tie"]);
    }

    #[test]
    fn stops_at_overfetch_limit() {
        let items = (0..30)
            .map(|i| item(&format!("story number {i}"), &format!("https://h{i}.com/x"), i % 59))
            .collect();
        let policy = SelectionPolicy {
            title_similarity: None,
            ..Default::default()
        };
        let out = select_candidates(items, 3, &policy);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn duplicate_links_and_near_identical_titles_are_skipped() {
        let items = vec![
            item("PM resigns after vote", "https://a.com/1", 9),
            item("PM resigns after vote", "https://a.com/1", 8),
            item("PM resigns after vote!", "https://b.com/9", 7),
            item("Baht hits six-month high", "https://c.com/2", 6),
        ];
        let out = select_candidates(items, 3, &SelectionPolicy::default());
        let links: Vec<_> = out.iter().map(|c| c.item.link.as_str()).collect();
        assert_eq!(links, vec!["https://a.com/1", "https://c.com/2"]);
    }

    #[test]
    fn similarity_can_be_disabled() {
        let policy = SelectionPolicy {
            title_similarity: None,
            ..Default::default()
        };
        let items = vec![
            item("Same headline", "https://a.com/1", 2),
            item("Same headline", "https://b.com/1", 1),
        ];
        assert_eq!(select_candidates(items, 3, &policy).len(), 2);
    }
}
