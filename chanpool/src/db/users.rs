//! ユーザーCRUD操作
//!
//! 管理APIのアクセストークン照合とオペレーター連絡先の解決に使う。

use crate::types::user::{Role, User, UserStatus};
use sqlx::SqlitePool;

/// ユーザーを作成
///
/// # Arguments
/// * `access_token` - 管理API用アクセストークン（不要なら `None`）
///
/// # Returns
/// * `Ok(User)` - 作成されたユーザー
/// * `Err(sqlx::Error)` - 作成失敗（ユーザー名・トークン重複など）
pub async fn create(
    pool: &SqlitePool,
    username: &str,
    role: Role,
    email: &str,
    access_token: Option<&str>,
) -> Result<User, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (username, role, status, email, access_token) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind(role.code())
    .bind(UserStatus::Enabled.as_str())
    .bind(email)
    .bind(access_token)
    .execute(pool)
    .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        username: username.to_string(),
        role,
        status: UserStatus::Enabled,
        email: email.to_string(),
    })
}

/// IDでユーザーを取得
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, role, status, email FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// アクセストークンでユーザーを取得
pub async fn find_by_access_token(
    pool: &SqlitePool,
    access_token: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, role, status, email FROM users WHERE access_token = ?",
    )
    .bind(access_token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// 最初に登録されたルートユーザーのメールアドレスを取得（空は除外）
pub async fn find_root_email(pool: &SqlitePool) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT email FROM users WHERE role >= ? AND email != '' ORDER BY id ASC LIMIT 1",
    )
    .bind(Role::Root.code())
    .fetch_optional(pool)
    .await
}

/// ユーザーの状態を更新
pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    status: UserStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// ユーザー数を取得（初回起動判定用）
pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    role: i64,
    status: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            role: Role::from_code(row.role),
            status: UserStatus::parse_lossy(&row.status),
            email: row.email,
        }
    }
}
