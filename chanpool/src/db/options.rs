//! オプションテーブルのストレージ層
//!
//! SQLiteベースのグローバルなキーバリュー設定を永続化

use sqlx::SqlitePool;

/// 無効化しきい値（秒、浮動小数）のキー
pub const CHANNEL_DISABLE_THRESHOLD: &str = "ChannelDisableThreshold";

/// オペレーター通知先アドレスのキー
pub const ROOT_USER_EMAIL: &str = "RootUserEmail";

/// 値を取得
pub async fn get_option(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT value FROM options WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
}

/// 値を保存（INSERT OR REPLACE）
pub async fn set_option(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR REPLACE INTO options (key, value, updated_at) VALUES (?, ?, datetime('now'))",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// 全オプションをキー順で取得
pub async fn list_options(pool: &SqlitePool) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>("SELECT key, value FROM options ORDER BY key")
        .fetch_all(pool)
        .await
}

/// 外部に公開してよいキーか
///
/// `Token` / `Secret` を含むキーは一覧APIから除外する。
pub fn is_public_key(key: &str) -> bool {
    !(key.contains("Token") || key.contains("Secret"))
}
