//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! # OpenAI互換エラーレスポンス
//!
//! `PoolError`は`error_type()`と`status_code()`メソッドを提供し、
//! リレー経路向けのOpenAI互換エラーレスポンスを生成できます。

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// チャネルプールのエラー型
#[derive(Debug, Error)]
pub enum PoolError {
    /// 指定IDのチャネルが存在しない
    #[error("Channel not found: {0}")]
    NotFound(i64),

    /// 有効なチャネルが1つもない
    #[error("No healthy channel available")]
    NoHealthyChannel,

    /// スイープが既に実行中
    #[error("Channel test is already running")]
    AlreadyRunning,

    /// プロバイダへの到達失敗（ネットワーク/タイムアウト/デコード失敗）
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTPは成功したがボディにエラーオブジェクトが含まれていた
    #[error("Provider error: {0}")]
    ProviderLogical(String),

    /// 永続化ストアの読み書き失敗
    #[error("Database error: {0}")]
    Database(String),

    /// 通知送信の失敗（呼び出し元には伝播させない）
    #[error("Notification error: {0}")]
    Notification(String),

    /// 認証エラー
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// 認可エラー
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// 入力値の検証エラー
    #[error("Validation error: {0}")]
    Validation(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(String),

    /// 内部エラー
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Returns a safe error message for external clients.
    ///
    /// Provider hosts, SQL text and similar details stay in the server logs;
    /// use the `Display` implementation for those.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Channel not found",
            Self::NoHealthyChannel => "No available channel",
            Self::AlreadyRunning => "Channel test is already running",
            Self::Transport(_) => "Upstream provider unavailable",
            Self::ProviderLogical(_) => "Upstream provider returned an error",
            Self::Database(_) => "Database error",
            Self::Notification(_) => "Notification delivery failed",
            Self::Authentication(_) => "Authentication failed",
            Self::Authorization(_) => "Access denied",
            Self::Validation(_) => "Invalid request",
            Self::Config(_) => "Configuration error",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the OpenAI-compatible error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found_error",
            Self::NoHealthyChannel => "service_unavailable",
            Self::AlreadyRunning => "invalid_request_error",
            Self::Transport(_) => "service_unavailable",
            Self::ProviderLogical(_) => "upstream_error",
            Self::Database(_) => "server_error",
            Self::Notification(_) => "server_error",
            Self::Authentication(_) => "authentication_error",
            Self::Authorization(_) => "permission_error",
            Self::Validation(_) => "invalid_request_error",
            Self::Config(_) => "server_error",
            Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NoHealthyChannel => StatusCode::SERVICE_UNAVAILABLE,
            Self::AlreadyRunning => StatusCode::CONFLICT,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::ProviderLogical(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts this error to an OpenAI-compatible error response.
    pub fn to_openai_error(&self) -> OpenAIErrorResponse {
        OpenAIErrorResponse {
            error: OpenAIErrorDetail {
                message: self.external_message().to_string(),
                error_type: self.error_type().to_string(),
                code: Some(self.status_code().as_u16().to_string()),
            },
        }
    }
}

/// OpenAI互換エラーレスポンス
///
/// # Example
///
/// ```json
/// {
///   "error": {
///     "message": "No available channel",
///     "type": "service_unavailable",
///     "code": "503"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIErrorResponse {
    /// The error details
    pub error: OpenAIErrorDetail,
}

/// OpenAIエラー詳細
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIErrorDetail {
    /// Human-readable error message
    pub message: String,
    /// Error type (e.g., "invalid_request_error", "server_error")
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code (optional, typically HTTP status as string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result type alias
pub type PoolResult<T> = Result<T, PoolError>;
