// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// The engine runs on in-memory feeds and stub transports; requests go through
// tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /api/articles (success headers, malformed body, enum spelling, 503)
// - GET /api/feeds

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt as _; // for `oneshot`

use news_localizer::api::{
    self, AppState, HEADER_ARTICLES_TRANSLATED, HEADER_FEEDS_ATTEMPTED, HEADER_FEEDS_YIELDED,
};
use news_localizer::config::FeedRegistry;
use news_localizer::engine::Engine;
use news_localizer::extract::ArticleSource;
use news_localizer::ingest::types::{FeedFetcher, FeedSource};
use news_localizer::translate::circuit::CircuitBreaker;
use news_localizer::translate::TranslationPipeline;
use news_localizer::{Category, Region};

const BODY_LIMIT: usize = 1024 * 1024;
const LIVE_FEED: &str = "https://live.example.com/rss";
const DEAD_FEED: &str = "https://dead.example.com/rss";

const LIVE_BODY: &str = r#"<?xml version="1.0"?>
<rss><channel>
<item><title>Baht rallies on export data</title><link>https://live.example.com/1</link>
<pubDate>Tue, 04 Mar 2025 10:00:00 GMT</pubDate><description>The baht gained against the dollar.</description></item>
<item><title>Flood warning issued for Ayutthaya</title><link>https://live.example.com/2</link>
<pubDate>Tue, 04 Mar 2025 09:00:00 GMT</pubDate><description>Residents were told to move valuables.</description></item>
</channel></rss>"#;

struct MapFetcher(HashMap<&'static str, &'static str>);

#[async_trait]
impl FeedFetcher for MapFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<String> {
        self.0
            .get(source.url.as_str())
            .map(|b| b.to_string())
            .ok_or_else(|| anyhow!("feed answered 500"))
    }
    fn name(&self) -> &'static str {
        "map"
    }
}

struct NoArticles;

#[async_trait]
impl ArticleSource for NoArticles {
    async fn fetch_text(&self, _url: &str) -> String {
        String::new()
    }
}

/// Thailand/general has one live and one dead feed; world/general only a dead one.
fn test_router() -> Router {
    let mut reg = FeedRegistry::default();
    reg.insert(Region::Thailand, Category::General, FeedSource::new("Live", LIVE_FEED));
    reg.insert(Region::Thailand, Category::General, FeedSource::new("Dead", DEAD_FEED));
    reg.insert(Region::World, Category::General, FeedSource::new("Dead", DEAD_FEED));

    let engine = Engine::new(
        Arc::new(reg),
        Arc::new(MapFetcher(HashMap::from([(LIVE_FEED, LIVE_BODY)]))),
        Arc::new(NoArticles),
        Arc::new(TranslationPipeline::new(
            Arc::new(CircuitBreaker::default()),
            "th",
        )),
    );
    api::router(AppState::new(engine))
}

fn post_articles(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/articles")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build POST /api/articles")
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn health_returns_ok() {
    let resp = test_router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn articles_returns_list_with_diagnostic_headers() {
    let payload = json!({"category": "general", "region": "thailand", "count": 3});
    let resp = test_router()
        .oneshot(post_articles(&payload.to_string()))
        .await
        .expect("oneshot /api/articles");
    assert_eq!(resp.status(), StatusCode::OK);

    let h = resp.headers();
    assert_eq!(h[HEADER_FEEDS_ATTEMPTED], "2");
    assert_eq!(h[HEADER_FEEDS_YIELDED], "1");
    assert_eq!(h[HEADER_ARTICLES_TRANSLATED], "0");

    let v = json_body(resp).await;
    let list = v.as_array().expect("array body");
    assert_eq!(list.len(), 2);

    let first = &list[0];
    assert_eq!(first["title"], "Baht rallies on export data");
    assert_eq!(first["slug"], "baht-rallies-on-export-data");
    assert_eq!(first["category"], "general");
    assert_eq!(first["isTranslated"], false);
    assert_eq!(first["sources"], json!(["https://live.example.com/1"]));
    for key in ["excerpt", "coverQuery", "coverUrl", "coverNote", "content"] {
        assert!(first.get(key).is_some(), "missing '{key}'");
    }
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let resp = test_router()
        .oneshot(post_articles("{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "invalid request");
    assert!(v["details"].is_string());
}

#[tokio::test]
async fn unknown_category_is_bad_request() {
    let payload = json!({"category": "weather", "region": "thailand"});
    let resp = test_router()
        .oneshot(post_articles(&payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "invalid request");
}

#[tokio::test]
async fn capitalised_enum_names_are_accepted() {
    let payload = json!({"category": "General", "region": "THAILAND", "count": 3});
    let resp = test_router()
        .oneshot(post_articles(&payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v[0]["category"], "general");
}

#[tokio::test]
async fn unregistered_pair_is_bad_request() {
    let payload = json!({"category": "sports", "region": "asia"});
    let resp = test_router()
        .oneshot(post_articles(&payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "no feeds configured");
}

#[tokio::test]
async fn all_feeds_dead_is_service_unavailable() {
    let payload = json!({"category": "general", "region": "world"});
    let resp = test_router()
        .oneshot(post_articles(&payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "no content available");
    assert_eq!(v["details"], "attempted 1 feeds, 0 yielded items");
}

#[tokio::test]
async fn feeds_lists_registered_sources() {
    let resp = test_router()
        .oneshot(
            Request::get("/api/feeds?region=Thailand&category=general")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["region"], "thailand");
    assert_eq!(v["category"], "general");
    assert_eq!(v["feeds"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["feeds"][0]["url"], LIVE_FEED);
}

#[tokio::test]
async fn feeds_with_unknown_region_is_bad_request() {
    let resp = test_router()
        .oneshot(
            Request::get("/api/feeds?region=mars&category=general")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
