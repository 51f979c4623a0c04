//! Cover-image query derivation.
//!
//! The query is `"<category> kw1 kw2 kw3"`, keywords taken from the title after
//! dropping stop-words and short tokens. Turning the query into a URL is a template
//! substitution behind [`CoverUrlBuilder`], so the image service can be swapped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::form_urlencoded;

use crate::article::Category;

pub const MAX_KEYWORDS: usize = 3;
pub const MIN_KEYWORD_CHARS: usize = 4;

static RE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\p{M}\s]").unwrap());

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "above", "after", "again", "against", "amid", "among", "before", "being",
        "below", "between", "breaking", "could", "during", "from", "have", "having", "here",
        "into", "just", "latest", "live", "more", "most", "news", "over", "report", "reports",
        "said", "says", "should", "since", "some", "than", "that", "their", "them", "then",
        "there", "these", "they", "this", "those", "through", "today", "under", "until",
        "update", "updates", "very", "were", "what", "when", "where", "which", "while", "will",
        "with", "would", "year", "years", "your",
    ]
    .into_iter()
    .collect()
});

/// Keywords of `title` usable in an image search.
pub fn title_keywords(title: &str) -> Vec<String> {
    let lower = title.to_lowercase();
    let cleaned = RE_PUNCT.replace_all(&lower, " ");
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_KEYWORD_CHARS)
        .filter(|t| !STOP_WORDS.contains(t))
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

/// `"<category> kw1 kw2 kw3"`.
pub fn cover_query(category: Category, title: &str) -> String {
    let mut parts = vec![category.as_str().to_string()];
    parts.extend(title_keywords(title));
    parts.join(" ")
}

/// Query → image URL.
pub trait CoverUrlBuilder: Send + Sync {
    fn build(&self, query: &str) -> String;
}

/// `{query}` in the template is replaced by the form-encoded, comma-joined query.
#[derive(Debug, Clone)]
pub struct TemplateCoverUrl {
    template: String,
}

pub const DEFAULT_COVER_TEMPLATE: &str = "https://source.unsplash.com/1600x900/?{query}";

impl TemplateCoverUrl {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Default for TemplateCoverUrl {
    fn default() -> Self {
        Self::new(DEFAULT_COVER_TEMPLATE)
    }
}

impl CoverUrlBuilder for TemplateCoverUrl {
    fn build(&self, query: &str) -> String {
        let joined = query.split_whitespace().collect::<Vec<_>>().join(",");
        let encoded: String = form_urlencoded::byte_serialize(joined.as_bytes()).collect();
        self.template.replace("{query}", &encoded)
    }
}

/// Editor-facing note stored next to the cover.
pub fn cover_note(query: &str) -> String {
    format!("Cover image selected by keyword search: \"{query}\". Replace with licensed artwork before publishing if needed.")
}
