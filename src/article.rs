//! article.rs: request enums and the normalized article shape returned by the API.
//!
//! `NormalizedArticle` is what downstream publishing consumes; `content` carries the
//! fixed section layout produced by `structure::render_document`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Geographic grouping of the feed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Thailand,
    Asia,
    World,
}

/// Topical grouping of the feed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Politics,
    Business,
    Technology,
    Sports,
    Entertainment,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Thailand, Region::Asia, Region::World];

    /// Case-insensitive parse of the wire name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|r| r.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Thailand => "thailand",
            Region::Asia => "asia",
            Region::World => "world",
        }
    }
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::Politics,
        Category::Business,
        Category::Technology,
        Category::Sports,
        Category::Entertainment,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Politics => "politics",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Request bodies and query strings accept the same spellings.
impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Region::parse(&raw).ok_or_else(|| {
            serde::de::Error::unknown_variant(&raw, &["thailand", "asia", "world"])
        })
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Category::parse(&raw).ok_or_else(|| {
            serde::de::Error::unknown_variant(
                &raw,
                &["general", "politics", "business", "technology", "sports", "entertainment"],
            )
        })
    }
}

pub const MIN_COUNT: usize = 3;
pub const MAX_COUNT: usize = 10;
pub const DEFAULT_COUNT: usize = 5;

fn default_count() -> usize {
    DEFAULT_COUNT
}

/// Body of `POST /api/articles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub category: Category,
    pub region: Region,
    #[serde(default = "default_count")]
    pub count: usize,
}

impl GenerateRequest {
    pub fn new(category: Category, region: Region, count: usize) -> Self {
        Self {
            category,
            region,
            count,
        }
    }

    /// Requested count clamped into `MIN_COUNT..=MAX_COUNT`.
    pub fn bounded_count(&self) -> usize {
        self.count.clamp(MIN_COUNT, MAX_COUNT)
    }
}

/// Final, publish-ready article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub category: Category,
    pub cover_query: String,
    pub cover_url: String,
    /// Always contains at least the originating link.
    pub sources: Vec<String>,
    pub content: String,
    pub is_translated: bool,
    pub cover_note: String,
}
