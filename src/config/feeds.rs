// src/config/feeds.rs
//! Feed registry: `(region, category) → [FeedSource]`.
//!
//! Loaded once at startup. Sources, in order:
//! 1) `$FEEDS_CONFIG_PATH` (TOML or JSON, must exist)
//! 2) `config/feeds.toml`
//! 3) `config/feeds.json`
//! 4) the built-in seed

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::article::{Category, Region};
use crate::ingest::types::FeedSource;
use crate::select::hostname_of;

const ENV_PATH: &str = "FEEDS_CONFIG_PATH";

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    feeds: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    region: String,
    category: String,
    #[serde(default)]
    name: String,
    url: String,
}

#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    feeds: HashMap<(Region, Category), Vec<FeedSource>>,
}

impl FeedRegistry {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed registry from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_registry(&content, &ext)
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("FEEDS_CONFIG_PATH points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let toml_p = PathBuf::from("config/feeds.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/feeds.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default_seed())
    }

    /// Feeds registered for the pair; empty if none.
    pub fn lookup(&self, region: Region, category: Category) -> &[FeedSource] {
        self.feeds
            .get(&(region, category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.feeds.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a feed; duplicate URLs within one pair are ignored.
    pub fn insert(&mut self, region: Region, category: Category, source: FeedSource) {
        let list = self.feeds.entry((region, category)).or_default();
        if !list.iter().any(|s| s.url == source.url) {
            list.push(source);
        }
    }

    /// Built-in registry used when no config file is present.
    pub fn default_seed() -> Self {
        use Category::*;
        use Region::*;

        let mut reg = Self::default();
        for (region, category, name, url) in [
            (Thailand, General, "Bangkok Post", "https://www.bangkokpost.com/rss/data/topstories.xml"),
            (Thailand, General, "Khaosod English", "https://www.khaosodenglish.com/feed/"),
            (Thailand, General, "Thai PBS World", "https://www.thaipbsworld.com/feed/"),
            (Thailand, Politics, "Bangkok Post", "https://www.bangkokpost.com/rss/data/thailand.xml"),
            (Thailand, Politics, "Khaosod English", "https://www.khaosodenglish.com/category/politics/feed/"),
            (Thailand, Business, "Bangkok Post", "https://www.bangkokpost.com/rss/data/business.xml"),
            (Thailand, Business, "Khaosod English", "https://www.khaosodenglish.com/category/business/feed/"),
            (Thailand, Technology, "Bangkok Post", "https://www.bangkokpost.com/rss/data/tech.xml"),
            (Thailand, Sports, "Bangkok Post", "https://www.bangkokpost.com/rss/data/sports.xml"),
            (Thailand, Entertainment, "Bangkok Post", "https://www.bangkokpost.com/rss/data/life.xml"),
            (Asia, General, "BBC Asia", "https://feeds.bbci.co.uk/news/world/asia/rss.xml"),
            (Asia, General, "The Diplomat", "https://thediplomat.com/feed/"),
            (Asia, Politics, "The Diplomat", "https://thediplomat.com/feed/"),
            (Asia, Politics, "BBC Asia", "https://feeds.bbci.co.uk/news/world/asia/rss.xml"),
            (Asia, Business, "Nikkei Asia", "https://asia.nikkei.com/rss/feed/nar"),
            (Asia, Business, "CNA Business", "https://www.channelnewsasia.com/rssfeeds/8395954"),
            (Asia, Technology, "Rest of World", "https://restofworld.org/feed/latest/"),
            (Asia, Sports, "SCMP Sport", "https://www.scmp.com/rss/95/feed"),
            (Asia, Entertainment, "Soompi", "https://www.soompi.com/feed"),
            (World, General, "BBC World", "https://feeds.bbci.co.uk/news/world/rss.xml"),
            (World, General, "Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
            (World, General, "The Guardian", "https://www.theguardian.com/world/rss"),
            (World, Politics, "BBC Politics", "https://feeds.bbci.co.uk/news/politics/rss.xml"),
            (World, Politics, "The Guardian", "https://www.theguardian.com/politics/rss"),
            (World, Business, "BBC Business", "https://feeds.bbci.co.uk/news/business/rss.xml"),
            (World, Business, "The Guardian", "https://www.theguardian.com/business/rss"),
            (World, Technology, "BBC Technology", "https://feeds.bbci.co.uk/news/technology/rss.xml"),
            (World, Technology, "The Verge", "https://www.theverge.com/rss/index.xml"),
            (World, Technology, "Ars Technica", "https://feeds.arstechnica.com/arstechnica/index"),
            (World, Sports, "BBC Sport", "https://feeds.bbci.co.uk/sport/rss.xml"),
            (World, Sports, "ESPN", "https://www.espn.com/espn/rss/news"),
            (World, Entertainment, "BBC Entertainment", "https://feeds.bbci.co.uk/news/entertainment_and_arts/rss.xml"),
            (World, Entertainment, "Variety", "https://variety.com/feed/"),
        ] {
            reg.insert(region, category, FeedSource::new(name, url));
        }
        reg
    }
}

fn parse_registry(s: &str, hint_ext: &str) -> Result<FeedRegistry> {
    let file: RegistryFile = match hint_ext {
        "json" => serde_json::from_str(s)?,
        "toml" => toml::from_str(s)?,
        _ => match toml::from_str(s) {
            Ok(f) => f,
            Err(_) => serde_json::from_str(s).map_err(|_| anyhow!("unsupported feed registry format"))?,
        },
    };
    Ok(build(file.feeds))
}

fn build(entries: Vec<FeedEntry>) -> FeedRegistry {
    let mut reg = FeedRegistry::default();
    for e in entries {
        let (Some(region), Some(category)) = (Region::parse(&e.region), Category::parse(&e.category)) else {
            tracing::warn!(target: "config", region = %e.region, category = %e.category, "unknown feed group, skipping");
            continue;
        };
        let url = e.url.trim();
        let Some(host) = hostname_of(url) else {
            tracing::warn!(target: "config", url, "feed url is not absolute http(s), skipping");
            continue;
        };
        let name = match e.name.trim() {
            "" => host,
            n => n.to_string(),
        };
        reg.insert(region, category, FeedSource::new(&name, url));
    }
    reg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_entries_are_grouped_and_cleaned() {
        let toml = r#"
[[feeds]]
region = "thailand"
category = "politics"
name = "Bangkok Post"
url = "https://www.bangkokpost.com/rss/data/thailand.xml"

[[feeds]]
region = "Thailand"
category = "POLITICS"
url = "https://www.khaosodenglish.com/feed/"

[[feeds]]
region = "mars"
category = "politics"
name = "Nope"
url = "https://example.com/rss"

[[feeds]]
region = "world"
category = "sports"
name = "Relative"
url = "/rss.xml"
"#;
        let reg = parse_registry(toml, "toml").unwrap();
        let feeds = reg.lookup(Region::Thailand, Category::Politics);
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].name, "Bangkok Post");
        assert_eq!(feeds[1].name, "www.khaosodenglish.com");
        assert_eq!(reg.len(), 2);
        assert!(reg.lookup(Region::World, Category::Sports).is_empty());
    }

    #[test]
    fn json_format_is_accepted() {
        let json = r#"{"feeds": [{"region": "asia", "category": "business", "name": "N", "url": "https://asia.nikkei.com/rss/feed/nar"}]}"#;
        let reg = parse_registry(json, "").unwrap();
        assert_eq!(reg.lookup(Region::Asia, Category::Business).len(), 1);
    }

    #[test]
    fn seed_covers_every_pair() {
        let reg = FeedRegistry::default_seed();
        for region in Region::ALL {
            for category in Category::ALL {
                assert!(
                    !reg.lookup(region, category).is_empty(),
                    "no seed feeds for {region}/{category}"
                );
            }
        }
    }

    #[test]
    fn duplicate_urls_in_a_pair_are_ignored() {
        let mut reg = FeedRegistry::default();
        let src = FeedSource::new("A", "https://a.example/rss");
        reg.insert(Region::World, Category::General, src.clone());
        reg.insert(Region::World, Category::General, src);
        assert_eq!(reg.len(), 1);
    }
}
