//! 共通型定義

/// エラー型
pub mod error;

/// レスポンスエンベロープ
pub mod envelope;
