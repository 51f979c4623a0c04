//! AI transform adapter: provider abstraction, quota classification, test doubles.
//!
//! A transform takes a system and a user prompt and returns the JSON object the model
//! produced. Failures keep enough shape for the pipeline to tell quota exhaustion apart
//! from everything else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ai::AiConfig;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI transform is disabled")]
    Disabled,
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("HTTP error: status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl AiError {
    /// Quota/rate-limit failures open the circuit breaker; nothing else does.
    pub fn is_quota(&self) -> bool {
        match self {
            AiError::RateLimited(_) => true,
            AiError::Http { status, body } => *status == 429 || looks_like_quota(body),
            AiError::Network(msg) => looks_like_quota(msg),
            AiError::Disabled | AiError::Timeout | AiError::Malformed(_) => false,
        }
    }
}

/// Provider-agnostic quota signatures (OpenAI, Gemini, generic gateways).
pub fn looks_like_quota(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    [
        "429",
        "quota",
        "rate limit",
        "rate_limit",
        "ratelimit",
        "resource_exhausted",
        "resource exhausted",
        "too many requests",
    ]
    .iter()
    .any(|needle| m.contains(needle))
}

/// Primary AI capability.
#[async_trait]
pub trait AiTransform: Send + Sync {
    async fn submit(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AiError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynAiTransform = Arc<dyn AiTransform>;

/// Pull the first JSON object out of a model reply.
///
/// Models wrap JSON in Markdown fences or add a sentence before it; both are tolerated.
pub fn parse_json_reply(raw: &str) -> Result<Value, AiError> {
    let trimmed = raw.trim();
    let start = trimmed
        .find('{')
        .ok_or_else(|| AiError::Malformed("no JSON object in reply".into()))?;
    let end = trimmed
        .rfind('}')
        .filter(|&e| e > start)
        .ok_or_else(|| AiError::Malformed("unterminated JSON object".into()))?;
    let value: Value = serde_json::from_str(&trimmed[start..=end])
        .map_err(|e| AiError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(AiError::Malformed("reply is not a JSON object".into()));
    }
    Ok(value)
}

// ------------------------------------------------------------
// OpenAI-compatible chat completions
// ------------------------------------------------------------

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiTransform {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiTransform {
    pub fn new(
        api_key: String,
        model: Option<&str>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("news-localizer/0.1")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AiTransform for OpenAiTransform {
    async fn submit(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::Disabled);
        }

        let req = ChatReq {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system_prompt,
                },
                Msg {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.3,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::RateLimited(body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResp = resp
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        parse_json_reply(&content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Test doubles (also reachable via AI_TEST_MODE)
// ------------------------------------------------------------

/// Always answers with the same JSON object.
#[derive(Clone)]
pub struct StaticTransform {
    pub reply: Value,
}

#[async_trait]
impl AiTransform for StaticTransform {
    async fn submit(&self, _system: &str, _user: &str) -> Result<Value, AiError> {
        Ok(self.reply.clone())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

/// Always fails; `quota` picks a rate-limit or a plain HTTP failure.
#[derive(Clone)]
pub struct FailingTransform {
    pub quota: bool,
}

#[async_trait]
impl AiTransform for FailingTransform {
    async fn submit(&self, _system: &str, _user: &str) -> Result<Value, AiError> {
        if self.quota {
            Err(AiError::RateLimited("429 Too Many Requests (test)".into()))
        } else {
            Err(AiError::Http {
                status: 500,
                body: "internal error (test)".into(),
            })
        }
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Factory: build the transform described by config and environment.
///
/// * `AI_TEST_MODE=mock` → [`StaticTransform`] with a fixed article.
/// * `AI_TEST_MODE=rate-limit` / `error` → [`FailingTransform`].
/// * disabled config → `None` (pipeline skips straight to fallback providers).
/// * `provider = "openai"` → [`OpenAiTransform`].
pub fn build_transform(config: &AiConfig, timeout: Duration) -> anyhow::Result<Option<DynAiTransform>> {
    match std::env::var("AI_TEST_MODE").ok().as_deref() {
        Some("mock") => {
            let reply = serde_json::json!({
                "title": "Mock headline",
                "excerpt": "Mock excerpt produced by the static AI transform for local runs.",
                "content": "Mock paragraph one.\n\nMock paragraph two.\n\nMock paragraph three."
            });
            return Ok(Some(Arc::new(StaticTransform { reply })));
        }
        Some("rate-limit") => return Ok(Some(Arc::new(FailingTransform { quota: true }))),
        Some("error") => return Ok(Some(Arc::new(FailingTransform { quota: false }))),
        _ => {}
    }

    if !config.enabled {
        return Ok(None);
    }

    match config.provider.as_str() {
        "openai" => {
            let t = OpenAiTransform::new(
                config.api_key.clone(),
                config.model.as_deref(),
                config.base_url.as_deref(),
                timeout,
            )?;
            Ok(Some(Arc::new(t)))
        }
        other => anyhow::bail!("Unsupported AI provider: {other}"),
    }
}
