//! チャネルプローブ
//!
//! 最小の合成チャットリクエスト（max_tokens=1）を1チャネルへ送り、
//! レイテンシを計測して結果を分類する。結果の永続化や無効化判定は行わない。

use crate::common::error::{PoolError, PoolResult};
use crate::types::channel::{
    Channel, ChannelKind, ProbeError, ProbeOutcome, RESPONSE_TIME_UNMEASURED,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// プローブのタイムアウト既定値（秒）
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 20;

/// Azureのデプロイ呼び出しに付与するapi-version
pub const AZURE_API_VERSION: &str = "2023-03-15-preview";

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// 合成リクエストのメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeMessage {
    /// ロール
    pub role: String,
    /// 本文
    pub content: String,
}

/// 合成チャットリクエスト
///
/// `model` が空の場合はチャネル種別の既定モデルで補う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRequest {
    /// モデル名
    pub model: String,
    /// 生成トークン上限（常に1）
    pub max_tokens: u32,
    /// メッセージ
    pub messages: Vec<ProbeMessage>,
}

impl ProbeRequest {
    /// 合成リクエストを作成
    pub fn new(model_override: Option<&str>) -> Self {
        Self {
            model: model_override.unwrap_or_default().trim().to_string(),
            max_tokens: 1,
            messages: vec![ProbeMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
        }
    }

    /// チャネル種別に合わせてモデル名を確定したリクエスト
    pub fn for_kind(&self, kind: ChannelKind) -> Self {
        let mut request = self.clone();
        if request.model.is_empty() {
            request.model = kind.default_probe_model().to_string();
        }
        request
    }
}

impl Default for ProbeRequest {
    fn default() -> Self {
        Self::new(None)
    }
}

/// 送信先URLと認証ヘッダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// リクエストURL
    pub url: String,
    /// 認証ヘッダー名
    pub header_name: &'static str,
    /// 認証ヘッダー値
    pub header_value: String,
}

/// チャネル種別ごとの送信先を組み立てる
///
/// - Azure: `{base}/openai/deployments/{model}/chat/completions?api-version=...` + `api-key`
///   （モデル名は1つのパスセグメントとしてエスケープする）
/// - Custom: `{base}/v1/chat/completions` + Bearer
/// - その他: `{base または既定ベース}/v1/chat/completions` + Bearer
pub fn request_target(channel: &Channel, model: &str) -> Result<RequestTarget, ProbeError> {
    let credential = channel.credential.clone().unwrap_or_default();
    let configured = channel.base_url.trim().trim_end_matches('/');

    let target = match channel.kind {
        ChannelKind::Azure => RequestTarget {
            url: azure_deployment_url(channel, require_base(channel, configured)?, model)?,
            header_name: "api-key",
            header_value: credential,
        },
        ChannelKind::Custom => RequestTarget {
            url: format!(
                "{}{}",
                require_base(channel, configured)?,
                CHAT_COMPLETIONS_PATH
            ),
            header_name: "Authorization",
            header_value: format!("Bearer {}", credential),
        },
        ChannelKind::OpenAi
        | ChannelKind::Api2d
        | ChannelKind::CloseAi
        | ChannelKind::OpenAiSb
        | ChannelKind::OpenAiMax
        | ChannelKind::OhMyGpt => {
            let base = if configured.is_empty() {
                channel.kind.default_base_url().unwrap_or_default()
            } else {
                configured
            };
            RequestTarget {
                url: format!("{}{}", base, CHAT_COMPLETIONS_PATH),
                header_name: "Authorization",
                header_value: format!("Bearer {}", credential),
            }
        }
    };

    Ok(target)
}

fn azure_deployment_url(channel: &Channel, base: &str, model: &str) -> Result<String, ProbeError> {
    let invalid = || {
        ProbeError::Transport(format!(
            "channel #{} ({}) has an invalid base URL: {}",
            channel.id, channel.kind, base
        ))
    };

    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(["openai", "deployments", model, "chat", "completions"]);
    url.query_pairs_mut()
        .clear()
        .append_pair("api-version", AZURE_API_VERSION);

    Ok(url.into())
}

fn require_base<'a>(channel: &Channel, configured: &'a str) -> Result<&'a str, ProbeError> {
    if configured.is_empty() {
        return Err(ProbeError::Transport(format!(
            "channel #{} ({}) has no base URL",
            channel.id, channel.kind
        )));
    }
    Ok(configured)
}

/// プロバイダ応答のうち判定に必要な部分
#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ProviderErrorBody {
    fn code_text(&self) -> String {
        match &self.code {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// コードまたはメッセージが空でなければ失敗扱い
    fn into_probe_error(self) -> Option<ProbeError> {
        let code = self.code_text();
        let message = self.message.unwrap_or_default();
        if code.is_empty() && message.is_empty() {
            return None;
        }
        Some(ProbeError::Provider {
            error_type: self.error_type.unwrap_or_default(),
            code,
            message,
        })
    }
}

/// 応答ボディを分類
fn classify_body(status: reqwest::StatusCode, body: &[u8]) -> Result<(), ProbeError> {
    let envelope: CompletionEnvelope = serde_json::from_slice(body)
        .map_err(|e| ProbeError::Transport(format!("failed to decode response: {}", e)))?;

    if let Some(error) = envelope.error.and_then(ProviderErrorBody::into_probe_error) {
        return Err(error);
    }
    if !status.is_success() {
        return Err(ProbeError::Transport(format!(
            "unexpected status {}",
            status
        )));
    }
    Ok(())
}

/// チャネルプローバー
///
/// 内部のHTTPクライアントはタイムアウト付きで共有される。
#[derive(Clone)]
pub struct ChannelProber {
    client: Client,
}

impl ChannelProber {
    /// タイムアウトを指定して作成
    pub fn new(timeout: Duration) -> PoolResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::Config(format!("Failed to create probe client: {}", e)))?;
        Ok(Self { client })
    }

    /// 1チャネルをプローブする
    ///
    /// 計測区間は送信直前からボディ読了まで。
    pub async fn probe(&self, channel: &Channel, request: &ProbeRequest) -> ProbeOutcome {
        let request = request.for_kind(channel.kind);
        let target = match request_target(channel, &request.model) {
            Ok(target) => target,
            Err(e) => return ProbeOutcome::failed(RESPONSE_TIME_UNMEASURED, e),
        };

        let start = Instant::now();
        let result = self.send(&target, &request).await;
        let latency_ms = start.elapsed().as_millis() as i64;

        let outcome = match result.and_then(|(status, body)| classify_body(status, &body)) {
            Ok(()) => ProbeOutcome::succeeded(latency_ms),
            Err(e) => ProbeOutcome::failed(latency_ms, e),
        };

        debug!(
            channel_id = channel.id,
            channel_name = %channel.name,
            model = %request.model,
            latency_ms,
            success = outcome.success,
            "Probe finished"
        );

        outcome
    }

    async fn send(
        &self,
        target: &RequestTarget,
        request: &ProbeRequest,
    ) -> Result<(reqwest::StatusCode, Vec<u8>), ProbeError> {
        let response = self
            .client
            .post(&target.url)
            .header(target.header_name, &target.header_value)
            .json(request)
            .send()
            .await
            .map_err(|e| ProbeError::Transport(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProbeError::Transport(describe_transport_error(&e)))?;

        Ok((status, body.to_vec()))
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        format!("request failed: {}", err)
    }
}
