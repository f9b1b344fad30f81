//! Integration Test: プローブの送信形式と応答分類
//!
//! 種別ごとのURL・認証ヘッダー、埋め込みエラー、デコード失敗、タイムアウトを確認する。

use chanpool::health::{ChannelProber, ProbeRequest};
use chanpool::types::channel::{Channel, ChannelKind, ProbeError, RESPONSE_TIME_UNMEASURED};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn ok_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "h"}}]
    })
}

fn prober() -> ChannelProber {
    ChannelProber::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn azure_probe_uses_deployment_path_and_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-35-turbo/chat/completions"))
        .and(query_param("api-version", "2023-03-15-preview"))
        .and(header("api-key", "az-secret"))
        .and(body_partial_json(json!({
            "model": "gpt-35-turbo",
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let channel =
        Channel::new(ChannelKind::Azure, "azure", "az-secret").with_base_url(server.uri());
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(outcome.success, "unexpected failure: {}", outcome.error_text());
    assert!(outcome.latency_ms >= 0);
}

#[tokio::test]
async fn custom_probe_uses_bearer_and_trims_trailing_slash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-custom"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let channel = Channel::new(ChannelKind::Custom, "custom", "sk-custom")
        .with_base_url(format!("{}/", server.uri()));
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(outcome.success, "unexpected failure: {}", outcome.error_text());
}

#[tokio::test]
async fn model_override_is_sent_to_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let channel =
        Channel::new(ChannelKind::OpenAi, "openai", "sk-o").with_base_url(server.uri());
    let outcome = prober()
        .probe(&channel, &ProbeRequest::new(Some(" gpt-4o-mini ")))
        .await;

    assert!(outcome.success, "unexpected failure: {}", outcome.error_text());
}

#[tokio::test]
async fn embedded_error_with_http_200_is_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "invalid_api_key",
                "message": "Incorrect API key provided"
            }
        })))
        .mount(&server)
        .await;

    let channel = Channel::new(ChannelKind::Custom, "c", "bad").with_base_url(server.uri());
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error,
        Some(ProbeError::Provider {
            error_type: "invalid_request_error".to_string(),
            code: "invalid_api_key".to_string(),
            message: "Incorrect API key provided".to_string(),
        })
    );
    assert!(outcome.error_text().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn numeric_error_code_is_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"type": "rate_limit", "code": 429, "message": ""}
        })))
        .mount(&server)
        .await;

    let channel = Channel::new(ChannelKind::Custom, "c", "k").with_base_url(server.uri());
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(!outcome.success);
    match outcome.error {
        Some(ProbeError::Provider { code, .. }) => assert_eq!(code, "429"),
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_error_object_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"type": "", "code": null, "message": ""},
            "choices": []
        })))
        .mount(&server)
        .await;

    let channel = Channel::new(ChannelKind::Custom, "c", "k").with_base_url(server.uri());
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(outcome.success);
    assert!(outcome.error_text().is_empty());
}

#[tokio::test]
async fn undecodable_body_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let channel = Channel::new(ChannelKind::Custom, "c", "k").with_base_url(server.uri());
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(!outcome.success);
    match outcome.error {
        Some(ProbeError::Transport(message)) => {
            assert!(message.starts_with("failed to decode response"))
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_upstream_times_out_as_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let channel = Channel::new(ChannelKind::Custom, "c", "k").with_base_url(server.uri());
    let prober = ChannelProber::new(Duration::from_millis(200)).unwrap();
    let outcome = prober.probe(&channel, &ProbeRequest::default()).await;

    assert!(!outcome.success);
    match outcome.error {
        Some(ProbeError::Transport(message)) => assert!(message.contains("timed out")),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert!(outcome.latency_ms >= 150);
}

#[tokio::test]
async fn latency_covers_response_delay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let channel = Channel::new(ChannelKind::Custom, "c", "k").with_base_url(server.uri());
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(outcome.success);
    assert!(outcome.latency_ms >= 200, "latency {}", outcome.latency_ms);
    assert!(outcome.elapsed_seconds() >= 0.2);
}

#[tokio::test]
async fn azure_without_base_url_fails_without_request() {
    let channel = Channel::new(ChannelKind::Azure, "azure", "k");
    let outcome = prober().probe(&channel, &ProbeRequest::default()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.latency_ms, RESPONSE_TIME_UNMEASURED);
    assert!(outcome.error_text().contains("has no base URL"));
}
