//! リレー経路（POST /v1/chat/completions）
//!
//! 選択したチャネルへボディをそのまま転送し、ステータスとボディをそのまま返す。
//! 観測したレイテンシはチャネルの応答時間として切り離して記録する。

use crate::api::error::RelayError;
use crate::common::error::PoolError;
use crate::health::probe::request_target;
use crate::types::user::Caller;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use std::time::Instant;
use tracing::{debug, warn};

/// ボディからモデル名を取り出す（Azureのデプロイ名に使う）
fn requested_model(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("model")
                .and_then(|model| model.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// POST /v1/chat/completions
pub async fn chat_completions(
    Extension(caller): Extension<Caller>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let channel = state.selector.select(caller.pinned_channel).await?;

    let mut model = requested_model(&body);
    if model.is_empty() {
        model = channel.kind.default_probe_model().to_string();
    }
    let target = request_target(&channel, &model).map_err(PoolError::from)?;

    let start = Instant::now();
    let upstream = state
        .http_client
        .post(&target.url)
        .header(target.header_name, &target.header_value)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| PoolError::Transport(format!("Relay request failed: {}", e)))?;

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| PoolError::Transport(format!("Failed to read relay response: {}", e)))?;
    let latency_ms = start.elapsed().as_millis() as i64;

    debug!(
        channel_id = channel.id,
        user_id = caller.user_id,
        status = status.as_u16(),
        latency_ms,
        "Relayed chat completion"
    );

    let store = state.store.clone();
    let channel_id = channel.id;
    tokio::spawn(async move {
        let tested_at = chrono::Utc::now().timestamp();
        if let Err(e) = store
            .update_probe_result(channel_id, latency_ms, tested_at)
            .await
        {
            warn!(channel_id, error = %e, "Failed to record relay latency");
        }
    });

    let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type =
        content_type.unwrap_or_else(|| HeaderValue::from_static("application/json"));
    Ok((status, [(header::CONTENT_TYPE, content_type)], bytes.to_vec()).into_response())
}
