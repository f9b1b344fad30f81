//! 初回起動時のルートユーザー作成
//!
//! 環境変数でアクセストークンが与えられていて、ユーザーが1人もいないときだけ作成する。

use crate::common::error::PoolError;
use crate::config::PoolConfig;
use crate::db;
use crate::db::traits::UserRepository;
use crate::types::user::Role;
use sqlx::SqlitePool;

/// ルートユーザー名
pub const ROOT_USERNAME: &str = "root";

/// 環境変数からルートユーザーを作成
///
/// # Returns
/// * `Ok(Some(user_id))` - 作成した
/// * `Ok(None)` - トークン未設定、または既にユーザーがいる
/// * `Err(PoolError)` - 作成失敗
pub async fn create_root_from_env(
    pool: &SqlitePool,
    config: &PoolConfig,
) -> Result<Option<i64>, PoolError> {
    let Some(access_token) = config.root_access_token.as_deref() else {
        tracing::debug!("CHANPOOL_ROOT_ACCESS_TOKEN not set, skipping root creation from env");
        return Ok(None);
    };

    let existing = db::users::count(pool)
        .await
        .map_err(|e| PoolError::Database(format!("Failed to count users: {}", e)))?;
    if existing > 0 {
        tracing::debug!(users = existing, "Users already exist, skipping root creation");
        return Ok(None);
    }

    let email = config.root_email.as_deref().unwrap_or_default();
    let user = pool
        .create_user(ROOT_USERNAME, Role::Root, email, Some(access_token))
        .await?;
    tracing::info!(user_id = user.id, "Created root user from env");

    if let Some(relay_key) = config.root_relay_key.as_deref() {
        let key = relay_key
            .strip_prefix(crate::auth::RELAY_KEY_PREFIX)
            .unwrap_or(relay_key);
        pool.create_token(user.id, "bootstrap", key).await?;
        tracing::info!(user_id = user.id, "Registered relay key for root user");
    }

    Ok(Some(user.id))
}
