//! Contract Test: /v1/chat/completions リレー
//!
//! リレー用キーの認証、チャネル指定の権限、上流への転送を確認する。

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use chanpool::db::traits::ChannelRepository;
use chanpool::types::channel::ChannelStatus;
use chanpool::types::user::Role;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, header as header_matcher, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::support::{create_test_app, create_user_with_relay_key, custom_channel, TestApp};

async fn relay(app: &TestApp, authorization: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::AUTHORIZATION, authorization)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn chat_body() -> Value {
    json!({"model": "gpt-4o-mini", "messages": [{"role": "user", "content": "hello"}]})
}

#[tokio::test]
async fn relay_forwards_to_an_enabled_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header_matcher("authorization", "Bearer sk-upstream"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-42",
            "choices": [{"message": {"role": "assistant", "content": "hi"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_test_app().await;
    let mut channel = custom_channel("upstream", &server.uri());
    channel.credential = Some("sk-upstream".to_string());
    let id = app.pool.create_channel(&channel).await.unwrap();
    let key = create_user_with_relay_key(&app.pool, "common", Role::Common).await;

    let (status, body) = relay(&app, &format!("Bearer sk-{}", key), chat_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "chatcmpl-42");

    // レイテンシは切り離して記録される
    let mut recorded = false;
    for _ in 0..50 {
        if app.pool.get_channel(id, false).await.unwrap().last_tested_at > 0 {
            recorded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(recorded);
}

#[tokio::test]
async fn upstream_error_status_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"type": "rate_limit", "code": "429", "message": "slow down"}
        })))
        .mount(&server)
        .await;

    let app = create_test_app().await;
    app.pool
        .create_channel(&custom_channel("limited", &server.uri()))
        .await
        .unwrap();
    let key = create_user_with_relay_key(&app.pool, "common", Role::Common).await;

    let (status, body) = relay(&app, &format!("Bearer sk-{}", key), chat_body()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["message"], "slow down");
}

#[tokio::test]
async fn ordinary_user_cannot_pin_a_channel() {
    let app = create_test_app().await;
    let id = app
        .pool
        .create_channel(&custom_channel("pinned", "http://127.0.0.1:9"))
        .await
        .unwrap();
    let key = create_user_with_relay_key(&app.pool, "common", Role::Common).await;

    let (status, body) = relay(&app, &format!("Bearer sk-{}-{}", key, id), chat_body()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Ordinary users cannot pin channels");
}

#[tokio::test]
async fn admin_can_pin_a_disabled_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pinned"})))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_test_app().await;
    let id = app
        .pool
        .create_channel(
            &custom_channel("pinned", &server.uri()).with_status(ChannelStatus::Disabled),
        )
        .await
        .unwrap();
    let key = create_user_with_relay_key(&app.pool, "admin", Role::Admin).await;

    let (status, body) = relay(&app, &format!("Bearer sk-{}-{}", key, id), chat_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "pinned");
}

#[tokio::test]
async fn empty_pool_is_service_unavailable() {
    let app = create_test_app().await;
    let key = create_user_with_relay_key(&app.pool, "common", Role::Common).await;

    let (status, body) = relay(&app, &format!("Bearer sk-{}", key), chat_body()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "service_unavailable");
}

#[tokio::test]
async fn unknown_relay_key_is_unauthorized() {
    let app = create_test_app().await;

    let (status, body) = relay(&app, "Bearer sk-doesnotexist", chat_body()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid API key");
}

#[tokio::test]
async fn malformed_pin_is_bad_request() {
    let app = create_test_app().await;
    let key = create_user_with_relay_key(&app.pool, "admin", Role::Admin).await;

    let (status, _) = relay(&app, &format!("Bearer sk-{}-abc", key), chat_body()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
