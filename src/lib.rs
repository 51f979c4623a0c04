// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod article;
pub mod config;
pub mod cover;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod select;
pub mod structure;
pub mod translate;

pub use crate::api::router;
pub use crate::article::{Category, GenerateRequest, NormalizedArticle, Region};
pub use crate::engine::{Engine, GenerateOutcome};
pub use crate::error::GenerateError;

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AiConfig, FeedRegistry, PipelineSettings};

/// Install the tracing subscriber. `LOG_FORMAT=json` switches to JSON lines.
/// A subscriber installed earlier (e.g. by the Shuttle runtime) is left in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_localizer=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Build the full router from environment and config files.
pub async fn app() -> anyhow::Result<Router> {
    let settings = PipelineSettings::from_env();
    let registry = FeedRegistry::load_default()?;
    let ai = AiConfig::load_default()?;
    let engine = Engine::from_settings(&settings, registry, &ai)?;

    let mut router = api::router(api::AppState::new(engine));
    match metrics::Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics recorder unavailable, /metrics disabled"),
    }
    Ok(router)
}
