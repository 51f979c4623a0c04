//! Plain machine-translation providers used when the AI transform is unavailable.
//!
//! Both are free endpoints with small request limits, so long fields are split into
//! sentence-aligned chunks and translated chunk by chunk. A provider answers `None`
//! for any failure; the pipeline decides what to do next.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::structure::split_sentences;

#[async_trait]
pub trait TextTranslator: Send + Sync {
    async fn translate(&self, text: &str, target_locale: &str) -> Option<String>;
    fn name(&self) -> &'static str;
}

/// Split `text` into pieces of at most `max_chars`, preferring sentence then word
/// boundaries. Words longer than `max_chars` are cut hard.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    fn push_piece(piece: &str, max_chars: usize, current: &mut String, chunks: &mut Vec<String>) {
        let extra = usize::from(!current.is_empty());
        if !current.is_empty() && current.chars().count() + extra + piece.chars().count() > max_chars {
            chunks.push(std::mem::take(current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(piece);
    }

    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if sentence.chars().count() <= max_chars {
            push_piece(&sentence, max_chars, &mut current, &mut chunks);
            continue;
        }
        for word in sentence.split_whitespace() {
            if word.chars().count() <= max_chars {
                push_piece(word, max_chars, &mut current, &mut chunks);
                continue;
            }
            let chars: Vec<char> = word.chars().collect();
            for part in chars.chunks(max_chars) {
                let part: String = part.iter().collect();
                push_piece(&part, max_chars, &mut current, &mut chunks);
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent("news-localizer/0.1")
        .connect_timeout(Duration::from_secs(4).min(timeout))
        .timeout(timeout)
        .build()?)
}

async fn translate_chunked<F, Fut>(text: &str, max_chars: usize, mut one: F) -> Option<String>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Option<String>>,
{
    let chunks = chunk_text(text, max_chars);
    if chunks.is_empty() {
        return None;
    }
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        out.push(one(chunk).await?);
    }
    let joined = out.join(" ").trim().to_string();
    (!joined.is_empty()).then_some(joined)
}

// ------------------------------------------------------------
// Google "gtx" endpoint (primary fallback)
// ------------------------------------------------------------

pub const GOOGLE_GTX_BASE_URL: &str = "https://translate.googleapis.com";
const GOOGLE_CHUNK_CHARS: usize = 1800;

pub struct GoogleGtxTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleGtxTranslator {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(GOOGLE_GTX_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn translate_chunk(&self, text: String, target_locale: &str) -> Option<String> {
        let resp = self
            .client
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_locale),
                ("dt", "t"),
                ("q", text.as_str()),
            ])
            .send()
            .await
            .map_err(|e| tracing::warn!(target: "translate", provider = "google", error = %e, "request failed"))
            .ok()?;
        if !resp.status().is_success() {
            tracing::warn!(target: "translate", provider = "google", status = %resp.status(), "non-success status");
            return None;
        }
        let body: Value = resp.json().await.ok()?;
        gtx_segments(&body)
    }
}

/// `[[["translated","source",...], ...], ...]` → concatenated translations.
pub fn gtx_segments(body: &Value) -> Option<String> {
    let joined: String = body
        .get(0)?
        .as_array()?
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    let joined = joined.trim().to_string();
    (!joined.is_empty()).then_some(joined)
}

#[async_trait]
impl TextTranslator for GoogleGtxTranslator {
    async fn translate(&self, text: &str, target_locale: &str) -> Option<String> {
        translate_chunked(text, GOOGLE_CHUNK_CHARS, |chunk| {
            self.translate_chunk(chunk, target_locale)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "google-gtx"
    }
}

// ------------------------------------------------------------
// MyMemory (secondary fallback)
// ------------------------------------------------------------

pub const MYMEMORY_BASE_URL: &str = "https://api.mymemory.translated.net";
pub const MYMEMORY_CHUNK_CHARS: usize = 450;

pub struct MyMemoryTranslator {
    client: reqwest::Client,
    base_url: String,
    source_locale: String,
    contact_email: Option<String>,
}

#[derive(Deserialize)]
struct MyMemoryResp {
    #[serde(rename = "responseData")]
    response_data: Option<MyMemoryData>,
    #[serde(rename = "responseStatus", default)]
    response_status: Value,
    #[serde(rename = "quotaFinished", default)]
    quota_finished: Option<bool>,
}

#[derive(Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl MyMemoryTranslator {
    pub fn new(source_locale: &str, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(MYMEMORY_BASE_URL, source_locale, timeout)
    }

    pub fn with_base_url(base_url: &str, source_locale: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            source_locale: source_locale.to_string(),
            contact_email: None,
        })
    }

    /// A contact address raises the anonymous daily quota.
    pub fn with_contact_email(mut self, email: Option<String>) -> Self {
        self.contact_email = email.filter(|e| !e.trim().is_empty());
        self
    }

    async fn translate_chunk(&self, text: String, target_locale: &str) -> Option<String> {
        let langpair = format!("{}|{}", self.source_locale, target_locale);
        let mut query = vec![("q", text.as_str()), ("langpair", langpair.as_str())];
        if let Some(email) = &self.contact_email {
            query.push(("de", email.as_str()));
        }
        let resp = self
            .client
            .get(format!("{}/get", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(|e| tracing::warn!(target: "translate", provider = "mymemory", error = %e, "request failed"))
            .ok()?;
        if !resp.status().is_success() {
            tracing::warn!(target: "translate", provider = "mymemory", status = %resp.status(), "non-success status");
            return None;
        }
        let body: MyMemoryResp = resp.json().await.ok()?;
        mymemory_text(body)
    }
}

fn mymemory_text(body: MyMemoryResp) -> Option<String> {
    // responseStatus arrives as a number or a string depending on the error path
    let status = match &body.response_status {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => Some(200),
    };
    if status != Some(200) || body.quota_finished == Some(true) {
        return None;
    }
    let text = body.response_data?.translated_text?;
    let text = html_escape::decode_html_entities(text.trim()).to_string();
    if text.is_empty() || text.to_ascii_uppercase().contains("MYMEMORY WARNING") {
        return None;
    }
    Some(text)
}

#[async_trait]
impl TextTranslator for MyMemoryTranslator {
    async fn translate(&self, text: &str, target_locale: &str) -> Option<String> {
        translate_chunked(text, MYMEMORY_CHUNK_CHARS, |chunk| {
            self.translate_chunk(chunk, target_locale)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "mymemory"
    }
}
