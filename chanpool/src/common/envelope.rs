//! 管理API共通のレスポンスエンベロープ
//!
//! `{"success": bool, "message": string, "data": ...}` 形式

use serde::Serialize;

/// 管理APIのレスポンス
#[derive(Debug, Clone, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    /// 成功したか
    pub success: bool,
    /// エラー時のメッセージ（成功時は空文字）
    pub message: String,
    /// ペイロード
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiEnvelope<T> {
    /// データ付きの成功レスポンス
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            data: Some(data),
        }
    }
}

impl ApiEnvelope<()> {
    /// データなしの成功レスポンス
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            message: String::new(),
            data: None,
        }
    }

    /// 失敗レスポンス
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
