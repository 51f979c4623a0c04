// src/ingest/parser.rs
//! Tolerant RSS/Atom item extraction.
//!
//! Feeds in the wild are frequently not well-formed XML (bare `&`, unclosed tags,
//! HTML pasted into `<description>`), so items are located with case-insensitive,
//! non-greedy block patterns and every field is resolved independently through an
//! ordered list of fallbacks. A broken field never drops the feed; a broken item
//! only drops that item.

use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::RawItem;
use crate::ingest::{clean_text, truncate_chars};

pub const MAX_DESCRIPTION_CHARS: usize = 500;

static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:item|entry)\b[^>]*>(.*?)</(?:item|entry)\s*>").expect("block regex")
});
static RE_CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata regex"));
static RE_LINK_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("link href regex")
});
static RE_GUID_PERMALINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<guid\b[^>]*?\bisPermaLink\s*=\s*["']true["'][^>]*>(.*?)</guid\s*>"#)
        .expect("guid regex")
});

/// `<tag ...>content</tag>` matchers, compiled once per tag name.
struct TagPatterns {
    title: Regex,
    link: Regex,
    dates: Vec<Regex>,
    descriptions: Vec<Regex>,
}

fn tag_regex(tag: &str) -> Regex {
    let t = regex::escape(tag);
    Regex::new(&format!(r"(?is)<{t}(?:\s[^>]*)?>(.*?)</{t}\s*>")).expect("tag regex")
}

static TAGS: Lazy<TagPatterns> = Lazy::new(|| TagPatterns {
    title: tag_regex("title"),
    link: tag_regex("link"),
    dates: ["pubDate", "published", "dc:date", "updated"]
        .iter()
        .map(|t| tag_regex(t))
        .collect(),
    descriptions: ["description", "summary", "content:encoded"]
        .iter()
        .map(|t| tag_regex(t))
        .collect(),
});

/// Cheap sniff before doing any real work.
pub fn looks_like_feed(body: &str) -> bool {
    let head = body.to_ascii_lowercase();
    head.contains("<rss") || head.contains("<feed") || head.contains("<?xml")
}

/// Parse a feed body into items, stamping undated items with `Utc::now()`.
pub fn parse_feed(body: &str) -> Vec<RawItem> {
    parse_feed_at(body, Utc::now())
}

/// Same as [`parse_feed`] with an explicit "now" for items without a usable date.
pub fn parse_feed_at(body: &str, now: DateTime<Utc>) -> Vec<RawItem> {
    if !looks_like_feed(body) {
        tracing::warn!(target: "ingest", bytes = body.len(), "payload is not rss/atom, skipping");
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut dropped = 0usize;
    for caps in RE_BLOCK.captures_iter(body) {
        let block = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        match parse_block(block, now) {
            Some(item) => out.push(item),
            None => dropped += 1,
        }
    }

    if out.is_empty() {
        tracing::warn!(target: "ingest", dropped, "feed yielded no usable items");
    } else {
        tracing::debug!(target: "ingest", kept = out.len(), dropped, "feed parsed");
    }
    counter!("feed_items_parsed_total").increment(out.len() as u64);
    out
}

fn parse_block(block: &str, now: DateTime<Utc>) -> Option<RawItem> {
    let title = extract_title(block);
    let link = extract_link(block);
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let published_at = TAGS
        .dates
        .iter()
        .find_map(|re| first_capture(re, block))
        .and_then(|raw| parse_timestamp(&unwrap_cdata(&raw)))
        .unwrap_or(now);

    let description = TAGS
        .descriptions
        .iter()
        .find_map(|re| first_capture(re, block))
        .map(|raw| truncate_chars(&clean_text(&unwrap_cdata(&raw)), MAX_DESCRIPTION_CHARS))
        .unwrap_or_default();

    Some(RawItem {
        title,
        link,
        published_at,
        description,
    })
}

fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn unwrap_cdata(s: &str) -> String {
    RE_CDATA.replace_all(s, "$1").trim().to_string()
}

fn extract_title(block: &str) -> String {
    first_capture(&TAGS.title, block)
        .map(|raw| clean_text(&unwrap_cdata(&raw)))
        .unwrap_or_default()
}

/// Attribute form first (Atom, self-closing), then tag content, then a permalink guid.
fn extract_link(block: &str) -> String {
    let candidates = [
        first_capture(&RE_LINK_HREF, block),
        first_capture(&TAGS.link, block),
        first_capture(&RE_GUID_PERMALINK, block),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|raw| {
            html_escape::decode_html_entities(&unwrap_cdata(&raw))
                .trim()
                .to_string()
        })
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// RFC 2822, RFC 3339, or a bare `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let via_time = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond()));
    if via_time.is_some() {
        return via_time;
    }

    // chrono accepts the obsolete zone names (GMT, EST, ...) that show up in old feeds
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_non_feed_payloads() {
        assert!(parse_feed_at("<html><body>nope</body></html>", fixed_now()).is_empty());
        assert!(parse_feed_at("", fixed_now()).is_empty());
        assert!(parse_feed_at("{\"items\": []}", fixed_now()).is_empty());
    }

    #[test]
    fn parses_rss_items_with_cdata_and_entities() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel>
<item>
  <title><![CDATA[Floods &amp; landslides <b>hit</b> north]]></title>
  <link>https://news.example.com/a?id=1&amp;x=2</link>
  <pubDate>Tue, 10 Jun 2025 08:30:00 +0700</pubDate>
  <description>&lt;p&gt;Heavy rain   continues.&lt;/p&gt;</description>
</item>
</channel></rss>"#;
        let items = parse_feed_at(xml, fixed_now());
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.title, "Floods & landslides hit north");
        assert_eq!(it.link, "https://news.example.com/a?id=1&x=2");
        assert_eq!(it.description, "Heavy rain continues.");
        assert_eq!(
            it.published_at,
            Utc.with_ymd_and_hms(2025, 6, 10, 1, 30, 0).unwrap()
        );
    }

    #[test]
    fn atom_href_wins_over_tag_content() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
<entry>
  <title>Atom entry</title>
  <link>https://rss-style.example.com/x</link>
  <link rel="alternate" href="https://atom-style.example.com/x"/>
  <updated>2025-03-01T12:00:00Z</updated>
  <summary>Short</summary>
</entry>
</feed>"#;
        let items = parse_feed_at(xml, fixed_now());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://atom-style.example.com/x");
    }

    #[test]
    fn guid_permalink_is_last_resort() {
        let xml = r#"<rss><channel><item>
<title>Guid only</title>
<guid isPermaLink="false">tag:abc</guid>
</item><item>
<title>Guid permalink</title>
<guid isPermaLink="true">https://example.org/p/1</guid>
</item></channel></rss>"#;
        let items = parse_feed_at(xml, fixed_now());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Guid permalink");
        assert_eq!(items[0].link, "https://example.org/p/1");
    }

    #[test]
    fn missing_or_bad_date_defaults_to_now() {
        let xml = r#"<rss><item><title>A</title><link>https://a.example/1</link>
<pubDate>not a date</pubDate></item>
<item><title>B</title><link>https://a.example/2</link></item></rss>"#;
        let items = parse_feed_at(xml, fixed_now());
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.published_at == fixed_now()));
    }

    #[test]
    fn date_fallback_order_prefers_pubdate() {
        let xml = r#"<rss><item><title>A</title><link>https://a.example/1</link>
<updated>2020-01-01T00:00:00Z</updated>
<pubDate>Wed, 02 Oct 2024 15:00:00 GMT</pubDate></item></rss>"#;
        let items = parse_feed_at(xml, fixed_now());
        assert_eq!(
            items[0].published_at,
            Utc.with_ymd_and_hms(2024, 10, 2, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn description_is_truncated_to_cap() {
        let long = "word ".repeat(300);
        let xml = format!(
            "<rss><item><title>T</title><link>https://x.example/1</link><description>{long}</description></item></rss>"
        );
        let items = parse_feed_at(&xml, fixed_now());
        assert_eq!(items[0].description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn items_without_title_or_link_are_dropped() {
        let xml = r#"<rss><item><title></title><link>https://x.example/1</link></item>
<item><title>No link</title></item>
<item><title>Ok</title><link>https://x.example/2</link></item></rss>"#;
        let items = parse_feed_at(xml, fixed_now());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Ok");
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2025-05-05 10:00:00").is_some());
        assert!(parse_timestamp("2025-05-05T10:00:00+07:00").is_some());
        assert!(parse_timestamp("Mon, 05 May 2025 10:00:00 EST").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
