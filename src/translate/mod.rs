//! Localisation of one article's (title, description, body).
//!
//! Order of attempts: AI transform (if configured and the breaker is closed), then
//! per-field machine translation through the ordered provider list, then the originals.
//! Nothing here returns an error to the caller.

pub mod ai;
pub mod circuit;
pub mod providers;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use self::ai::{AiError, DynAiTransform};
use self::circuit::CircuitBreaker;
use self::providers::TextTranslator;
use crate::structure::{split_sentences, word_bounded, EXCERPT_MAX_CHARS};

pub const DERIVED_TITLE_MAX_CHARS: usize = 120;
pub const DEFAULT_TONE: &str = "neutral, concise news";
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(15);

/// Source fields as they came from the feed and the article page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceText {
    pub title: String,
    pub description: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Primary,
    Fallback,
    PassThrough,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Primary => "primary",
            Stage::Fallback => "fallback",
            Stage::PassThrough => "passthrough",
        }
    }
}

/// Best-effort output; `used_ai` is false only for pass-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub used_ai: bool,
    pub stage: Stage,
}

/// Fields produced by one stage; any of them may be missing.
#[derive(Debug, Clone, Default)]
struct Partial {
    title: Option<String>,
    excerpt: Option<String>,
    content: Option<String>,
}

pub struct TranslationPipeline {
    ai: Option<DynAiTransform>,
    translators: Vec<Arc<dyn TextTranslator>>,
    circuit: Arc<CircuitBreaker>,
    target_locale: String,
    tone: String,
    ai_timeout: Duration,
}

impl TranslationPipeline {
    pub fn new(circuit: Arc<CircuitBreaker>, target_locale: impl Into<String>) -> Self {
        Self {
            ai: None,
            translators: Vec::new(),
            circuit,
            target_locale: target_locale.into(),
            tone: DEFAULT_TONE.to_string(),
            ai_timeout: DEFAULT_AI_TIMEOUT,
        }
    }

    pub fn with_ai(mut self, ai: Option<DynAiTransform>) -> Self {
        self.ai = ai;
        self
    }

    /// Appends to the fallback chain; order of calls is priority order.
    pub fn with_translator(mut self, translator: Arc<dyn TextTranslator>) -> Self {
        self.translators.push(translator);
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_ai_timeout(mut self, timeout: Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    pub fn target_locale(&self) -> &str {
        &self.target_locale
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    pub async fn run(&self, src: &SourceText) -> Translated {
        self.run_at(src, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit clock for the breaker.
    pub async fn run_at(&self, src: &SourceText, now: DateTime<Utc>) -> Translated {
        if let Some(fields) = self.try_primary(src, now).await {
            return self.finish(fields, src, Stage::Primary);
        }
        if let Some(fields) = self.try_fallback(src).await {
            return self.finish(fields, src, Stage::Fallback);
        }
        self.finish(Partial::default(), src, Stage::PassThrough)
    }

    async fn try_primary(&self, src: &SourceText, now: DateTime<Utc>) -> Option<Partial> {
        let ai = self.ai.as_ref()?;
        if !self.circuit.allows(now) {
            counter!("ai_circuit_skips_total").increment(1);
            tracing::debug!(target: "translate", provider = ai.name(), "circuit open, skipping AI");
            return None;
        }

        let system = system_prompt(&self.target_locale, &self.tone);
        let user = user_prompt(src);
        let outcome = match tokio::time::timeout(self.ai_timeout, ai.submit(&system, &user)).await {
            Ok(res) => res.and_then(|v| fields_from_reply(&v)),
            Err(_) => Err(AiError::Timeout),
        };

        match outcome {
            Ok(fields) => Some(fields),
            Err(e) => {
                if e.is_quota() {
                    self.circuit.record_failure(now);
                    counter!("ai_quota_failures_total").increment(1);
                    tracing::warn!(
                        target: "translate",
                        provider = ai.name(),
                        cooldown_secs = self.circuit.cooldown().as_secs(),
                        error = %e,
                        "AI quota exhausted, opening circuit"
                    );
                } else {
                    tracing::warn!(target: "translate", provider = ai.name(), error = %e, "AI transform failed");
                }
                None
            }
        }
    }

    async fn try_fallback(&self, src: &SourceText) -> Option<Partial> {
        if self.translators.is_empty() {
            return None;
        }
        let fields = Partial {
            title: self.translate_field(&src.title).await,
            excerpt: self.translate_field(&src.description).await,
            content: self.translate_field(&src.body).await,
        };
        let any = fields.title.is_some() || fields.excerpt.is_some() || fields.content.is_some();
        any.then_some(fields)
    }

    async fn translate_field(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        for t in &self.translators {
            if let Some(out) = t.translate(text, &self.target_locale).await {
                let out = out.trim().to_string();
                if !out.is_empty() {
                    return Some(out);
                }
            }
            tracing::debug!(target: "translate", provider = t.name(), chars = text.chars().count(), "translator gave no text");
        }
        None
    }

    fn finish(&self, fields: Partial, src: &SourceText, stage: Stage) -> Translated {
        counter!("translate_stage_total", "stage" => stage.as_str()).increment(1);

        let content = fields.content.unwrap_or_else(|| src.body.clone());
        let title = fields
            .title
            .or_else(|| non_empty(&src.title))
            .unwrap_or_else(|| derive_title(&content));
        let excerpt = fields
            .excerpt
            .or_else(|| non_empty(&src.description))
            .unwrap_or_else(|| word_bounded(&content, EXCERPT_MAX_CHARS));

        Translated {
            title,
            excerpt,
            content,
            used_ai: stage != Stage::PassThrough,
            stage,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

/// First sentence of `content`, word-bounded to 120 chars.
pub fn derive_title(content: &str) -> String {
    split_sentences(content)
        .into_iter()
        .next()
        .map(|s| word_bounded(&s, DERIVED_TITLE_MAX_CHARS))
        .unwrap_or_default()
}

fn language_name(locale: &str) -> &str {
    match locale.split(['-', '_']).next().unwrap_or(locale) {
        "th" => "Thai",
        "en" => "English",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "ms" => "Malay",
        "ja" => "Japanese",
        "zh" => "Chinese",
        "ko" => "Korean",
        _ => locale,
    }
}

pub fn system_prompt(locale: &str, tone: &str) -> String {
    format!(
        "You are a news editor localising articles for readers in locale \"{locale}\". \
Rewrite the source article in {language} with a {tone} tone. Keep names, numbers and \
quotes accurate and do not add facts that are not in the source. \
Respond with one JSON object only, with keys: \
\"title\" (string), \
\"excerpt\" (string, 160 to 220 characters), \
\"content\" (string, 3 to 6 paragraphs separated by blank lines).",
        language = language_name(locale),
    )
}

pub fn user_prompt(src: &SourceText) -> String {
    format!(
        "Title: {}\nDescription: {}\n\nBody:\n{}",
        src.title.trim(),
        src.description.trim(),
        src.body.trim()
    )
}

/// Interpret an AI reply object. `content` may be a string or a list of paragraphs.
fn fields_from_reply(v: &Value) -> Result<Partial, AiError> {
    let text = |key: &str| {
        v.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let content = match v.get("content") {
        Some(Value::Array(parts)) => {
            let joined = parts
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
            (!joined.is_empty()).then_some(joined)
        }
        _ => text("content"),
    };

    let title = text("title");
    match (title, content) {
        (Some(title), Some(content)) => Ok(Partial {
            title: Some(title),
            excerpt: text("excerpt").or_else(|| Some(word_bounded(&content, EXCERPT_MAX_CHARS))),
            content: Some(content),
        }),
        _ => Err(AiError::Malformed("reply lacks title or content".into())),
    }
}
