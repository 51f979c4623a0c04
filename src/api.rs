use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::article::{Category, GenerateRequest, Region};
use crate::engine::Engine;
use crate::error::GenerateError;
use crate::ingest::types::FeedSource;

pub const HEADER_FEEDS_ATTEMPTED: &str = "x-feeds-attempted";
pub const HEADER_FEEDS_YIELDED: &str = "x-feeds-yielded";
pub const HEADER_ARTICLES_TRANSLATED: &str = "x-articles-translated";

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/articles", post(generate_articles))
        .route("/api/feeds", get(list_feeds))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn generate_articles(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rej) => {
            tracing::debug!(target: "api", error = %rej.body_text(), "rejected request body");
            return GenerateError::InvalidRequest(rej.body_text()).into_response();
        }
    };

    match state.engine.generate(&req).await {
        Ok(out) => {
            let mut resp = Json(out.articles).into_response();
            let headers = resp.headers_mut();
            for (name, value) in [
                (HEADER_FEEDS_ATTEMPTED, out.feeds_attempted),
                (HEADER_FEEDS_YIELDED, out.feeds_yielded),
                (HEADER_ARTICLES_TRANSLATED, out.translated),
            ] {
                headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
            }
            resp
        }
        Err(e) => {
            tracing::warn!(target: "api", error = %e, details = ?e.details(), "generation failed");
            e.into_response()
        }
    }
}

#[derive(serde::Serialize)]
struct FeedsResp<'a> {
    region: Region,
    category: Category,
    feeds: &'a [FeedSource],
}

async fn list_feeds(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let region = q.get("region").and_then(|r| Region::parse(r));
    let category = q.get("category").and_then(|c| Category::parse(c));
    let (Some(region), Some(category)) = (region, category) else {
        return GenerateError::InvalidRequest(
            "query parameters `region` and `category` must name a known region and category"
                .to_string(),
        )
        .into_response();
    };

    Json(FeedsResp {
        region,
        category,
        feeds: state.engine.registry().lookup(region, category),
    })
    .into_response()
}
