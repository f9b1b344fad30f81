//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

/// チャネル管理
pub mod channels;

/// データベースマイグレーション
pub mod migrations;

/// グローバルオプション
pub mod options;

/// リレー用トークン
pub mod tokens;

/// Repository traitパターン（テスタビリティ向上）
pub mod traits;

/// ユーザー管理
pub mod users;
