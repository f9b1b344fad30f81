//! リレー用トークン操作
//!
//! 平文は保存せず、SHA-256ハッシュで照合する。

use crate::types::user::{Role, User, UserStatus};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// トークンを登録し、採番されたIDを返す
///
/// `key` は `sk-` プレフィックスを除いた本体部分。
pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    name: &str,
    key: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO tokens (user_id, name, key_hash, status) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(name)
        .bind(hash_key(key))
        .bind(UserStatus::Enabled.as_str())
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// 有効なトークンの所有ユーザーを取得
pub async fn find_owner(pool: &SqlitePool, key: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String, i64, String, String)>(
        r#"
        SELECT u.id, u.username, u.role, u.status, u.email
        FROM tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.key_hash = ? AND t.status = ?
        "#,
    )
    .bind(hash_key(key))
    .bind(UserStatus::Enabled.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, username, role, status, email)| User {
        id,
        username,
        role: Role::from_code(role),
        status: UserStatus::parse_lossy(&status),
        email,
    }))
}

/// トークンを無効化
pub async fn disable(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE tokens SET status = ? WHERE id = ?")
        .bind(UserStatus::Disabled.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// トークン本体をSHA-256でハッシュ化
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}
