// src/config/app.rs
//! Pipeline knobs read from the environment. Every value has a default; unparsable
//! values fall back to it with a warning.

use std::str::FromStr;
use std::time::Duration;

use crate::cover::DEFAULT_COVER_TEMPLATE;
use crate::select::SelectionPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub feed_timeout: Duration,
    pub article_timeout: Duration,
    pub ai_timeout: Duration,
    pub translate_timeout: Duration,
    /// Whole enrichment (extract + translate + structure) of one candidate.
    pub candidate_timeout: Duration,
    pub ai_cooldown: Duration,
    pub per_host_cap: usize,
    pub overfetch_factor: usize,
    pub target_locale: String,
    /// Source language handed to translators that need an explicit pair.
    pub source_locale: String,
    pub tone: String,
    pub max_article_chars: usize,
    pub min_article_chars: usize,
    pub cover_url_template: String,
    pub mymemory_email: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            feed_timeout: Duration::from_secs(12),
            article_timeout: Duration::from_secs(15),
            ai_timeout: Duration::from_secs(15),
            translate_timeout: Duration::from_secs(12),
            candidate_timeout: Duration::from_secs(45),
            ai_cooldown: Duration::from_secs(300),
            per_host_cap: 2,
            overfetch_factor: 2,
            target_locale: "th".to_string(),
            source_locale: "en".to_string(),
            tone: crate::translate::DEFAULT_TONE.to_string(),
            max_article_chars: crate::extract::DEFAULT_MAX_CHARS,
            min_article_chars: 200,
            cover_url_template: DEFAULT_COVER_TEMPLATE.to_string(),
            mymemory_email: None,
        }
    }
}

impl PipelineSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key → value source.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let text = |key: &str, default: String| {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        let secs = |key: &str, default: Duration| {
            Duration::from_secs(parse_or(&get, key, default.as_secs(), |v: &u64| *v > 0))
        };

        Self {
            feed_timeout: secs("FEED_TIMEOUT_SECS", d.feed_timeout),
            article_timeout: secs("ARTICLE_TIMEOUT_SECS", d.article_timeout),
            ai_timeout: secs("AI_TIMEOUT_SECS", d.ai_timeout),
            translate_timeout: secs("TRANSLATE_TIMEOUT_SECS", d.translate_timeout),
            candidate_timeout: secs("CANDIDATE_TIMEOUT_SECS", d.candidate_timeout),
            ai_cooldown: secs("AI_COOLDOWN_SECS", d.ai_cooldown),
            per_host_cap: parse_or(&get, "PER_HOST_CAP", d.per_host_cap, |v| *v > 0),
            overfetch_factor: parse_or(&get, "OVERFETCH_FACTOR", d.overfetch_factor, |v| *v > 0),
            target_locale: text("TARGET_LOCALE", d.target_locale),
            source_locale: text("SOURCE_LOCALE", d.source_locale),
            tone: text("ARTICLE_TONE", d.tone),
            max_article_chars: parse_or(&get, "MAX_ARTICLE_CHARS", d.max_article_chars, |v| *v > 0),
            min_article_chars: parse_or(&get, "MIN_ARTICLE_CHARS", d.min_article_chars, |_| true),
            cover_url_template: text("COVER_URL_TEMPLATE", d.cover_url_template),
            mymemory_email: get("MYMEMORY_EMAIL").filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            per_host_cap: self.per_host_cap,
            overfetch_factor: self.overfetch_factor,
            ..SelectionPolicy::default()
        }
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    let Some(raw) = get(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            tracing::warn!(target: "config", key, value = %raw, ?default, "invalid setting, using default");
            default
        }
    }
}
