// tests/providers_http.rs
use news_localizer::translate::ai::{AiError, AiTransform, OpenAiTransform};
use news_localizer::translate::providers::{
    GoogleGtxTranslator, MyMemoryTranslator, TextTranslator,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn google_joins_translated_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("client", "gtx"))
        .and(query_param("tl", "th"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [["ตลาดหุ้น ", "Stocks ", null], ["ปิดบวก", "close higher", null]],
            null,
            "en"
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let g = GoogleGtxTranslator::with_base_url(&server.uri(), TIMEOUT).unwrap();
    let out = g.translate("Stocks close higher", "th").await;
    assert_eq!(out.as_deref(), Some("ตลาดหุ้น ปิดบวก"));
}

#[tokio::test]
async fn google_error_status_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let g = GoogleGtxTranslator::with_base_url(&server.uri(), TIMEOUT).unwrap();
    assert_eq!(g.translate("anything", "th").await, None);
}

#[tokio::test]
async fn mymemory_translates_long_text_in_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .and(query_param("langpair", "en|th"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseData": {"translatedText": "ข้อความ"},
            "responseStatus": 200
        })))
        .expect(2)
        .mount(&server)
        .await;

    // two sentences of ~300 chars each cannot share one 450-char request
    let sentence = format!("{}.", "word ".repeat(60).trim_end());
    let text = format!("{sentence} {sentence}");

    let m = MyMemoryTranslator::with_base_url(&server.uri(), "en", TIMEOUT).unwrap();
    let out = m.translate(&text, "th").await;
    assert_eq!(out.as_deref(), Some("ข้อความ ข้อความ"));
}

#[tokio::test]
async fn mymemory_quota_warning_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseData": {"translatedText": "MYMEMORY WARNING: YOU USED ALL AVAILABLE FREE TRANSLATIONS FOR TODAY"},
            "responseStatus": 429,
            "quotaFinished": true
        })))
        .mount(&server)
        .await;

    let m = MyMemoryTranslator::with_base_url(&server.uri(), "en", TIMEOUT).unwrap();
    assert_eq!(m.translate("Short text.", "th").await, None);
}

#[tokio::test]
async fn openai_rate_limit_is_classified_as_quota() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": {"message": "Rate limit reached", "type": "requests"}})),
        )
        .mount(&server)
        .await;

    let ai = OpenAiTransform::new("sk-test".into(), None, Some(&server.uri()), TIMEOUT).unwrap();
    let err = ai.submit("system", "user").await.unwrap_err();
    assert!(matches!(err, AiError::RateLimited(_)), "{err:?}");
    assert!(err.is_quota());
}

#[tokio::test]
async fn openai_fenced_reply_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "```json\n{\"title\": \"หัวข้อ\", \"excerpt\": \"สรุป\", \"content\": \"เนื้อหา\"}\n```"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ai = OpenAiTransform::new("sk-test".into(), Some("gpt-4o-mini"), Some(&server.uri()), TIMEOUT)
        .unwrap();
    let v = ai.submit("system", "user").await.unwrap();
    assert_eq!(v["title"], "หัวข้อ");
    assert_eq!(v["content"], "เนื้อหา");
}

#[tokio::test]
async fn openai_server_error_is_not_quota() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let ai = OpenAiTransform::new("sk-test".into(), None, Some(&server.uri()), TIMEOUT).unwrap();
    let err = ai.submit("system", "user").await.unwrap_err();
    assert!(matches!(err, AiError::Http { status: 502, .. }));
    assert!(!err.is_quota());
}
