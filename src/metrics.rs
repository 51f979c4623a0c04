use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process and describe our series.
    /// Later calls reuse the installed handle.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE.get_or_try_init(|| {
            let handle = PrometheusBuilder::new().install_recorder()?;
            describe();
            Ok::<_, anyhow::Error>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("feeds_fetched_total", "Feed fetch attempts");
    describe_counter!("feed_errors_total", "Feed fetches that failed in transport or status");
    describe_counter!("feed_items_parsed_total", "Items retained by the feed parser");
    describe_counter!("candidates_selected_total", "Candidates admitted by the selector");
    describe_counter!("article_extract_failures_total", "Article pages that could not be fetched");
    describe_counter!("translate_stage_total", "Translation outcomes by stage");
    describe_counter!("ai_quota_failures_total", "AI calls rejected for quota or rate limit");
    describe_counter!("ai_circuit_skips_total", "AI calls skipped while the circuit was open");
    describe_counter!("articles_generated_total", "Articles returned to callers");
    describe_histogram!("generate_duration_ms", "Wall time of one generation request");
    describe_histogram!("feed_harvest_ms", "Wall time of the concurrent feed harvest");
}
