//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング。管理APIはエンベロープ形式、
//! リレー経路はOpenAI互換形式で返す。

use crate::common::envelope::ApiEnvelope;
use crate::common::error::PoolError;
use axum::{response::IntoResponse, Json};

/// 管理API用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub PoolError);

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // 内部詳細（ホスト名・SQLなど）はログにだけ残す
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Admin API request failed");
        } else {
            tracing::debug!(error = %self.0, "Admin API request rejected");
        }

        let message = match &self.0 {
            // 利用者の入力に由来する内容はそのまま返す
            PoolError::Validation(detail)
            | PoolError::Authentication(detail)
            | PoolError::Authorization(detail) => detail.clone(),
            PoolError::NotFound(id) => format!("Channel not found: {}", id),
            other => other.external_message().to_string(),
        };

        (status, Json(ApiEnvelope::fail(message))).into_response()
    }
}

/// リレー経路用のエラーレスポンス型
#[derive(Debug)]
pub struct RelayError(pub PoolError);

impl From<PoolError> for RelayError {
    fn from(err: PoolError) -> Self {
        RelayError(err)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(error = %self.0, "Relay request failed");
        let mut body = self.0.to_openai_error();
        if let PoolError::Authentication(detail) | PoolError::Authorization(detail) = &self.0 {
            body.error.message = detail.clone();
        }
        (self.0.status_code(), Json(body)).into_response()
    }
}
