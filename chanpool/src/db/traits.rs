//! Repository traitパターン定義
//!
//! DB操作を抽象化し、テスタビリティを向上させるためのtrait群。
//! 各traitは既存のフリー関数に対応し、`sqlx::Error` を `PoolError` に包む。

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::common::error::{PoolError, PoolResult};
use crate::types::channel::{Channel, ChannelStatus, ChannelUpdate};
use crate::types::user::{Role, User};

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> PoolError {
    move |e| PoolError::Database(format!("{}: {}", context, e))
}

fn require_found(id: i64, found: bool) -> PoolResult<()> {
    if found {
        Ok(())
    } else {
        Err(PoolError::NotFound(id))
    }
}

// ---------------------------------------------------------------------------
// ChannelRepository
// ---------------------------------------------------------------------------

/// チャネルストアのRepository trait
///
/// 一覧・検索は認証情報を含まない。更新系は担当列のみを書き換える。
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// チャネルを登録し、IDを返す
    async fn create_channel(&self, channel: &Channel) -> PoolResult<i64>;
    /// 複数チャネルを一括登録
    async fn create_channels(&self, channels: &[Channel]) -> PoolResult<Vec<i64>>;
    /// ページ単位の一覧（認証情報なし、ID降順）
    async fn list_channels(&self, offset: i64, limit: i64) -> PoolResult<Vec<Channel>>;
    /// スイープ対象の全チャネル（状態に関係なく、ID降順、認証情報あり）
    async fn list_all_channels(&self) -> PoolResult<Vec<Channel>>;
    /// IDまたは名前前方一致で検索（認証情報なし）
    async fn search_channels(&self, keyword: &str) -> PoolResult<Vec<Channel>>;
    /// IDで取得。存在しなければ `NotFound`
    async fn get_channel(&self, id: i64, with_credential: bool) -> PoolResult<Channel>;
    /// 有効チャネルから一様ランダムに取得。空なら `NoHealthyChannel`
    async fn pick_random_enabled(&self) -> PoolResult<Channel>;
    /// 管理操作による部分更新。存在しなければ `NotFound`
    async fn update_channel(&self, update: &ChannelUpdate) -> PoolResult<()>;
    /// レイテンシと計測時刻のみ更新
    async fn update_probe_result(&self, id: i64, latency_ms: i64, tested_at: i64)
        -> PoolResult<()>;
    /// ステータスのみ更新
    async fn update_status(&self, id: i64, status: ChannelStatus) -> PoolResult<()>;
    /// 残高スナップショットのみ更新
    async fn update_balance(&self, id: i64, balance: f64, updated_at: i64) -> PoolResult<()>;
    /// 削除
    async fn delete_channel(&self, id: i64) -> PoolResult<()>;
}

// ---------------------------------------------------------------------------
// OptionRepository
// ---------------------------------------------------------------------------

/// グローバルオプションのRepository trait
#[async_trait]
pub trait OptionRepository: Send + Sync {
    /// 値を取得
    async fn get_option(&self, key: &str) -> PoolResult<Option<String>>;
    /// 値を保存
    async fn set_option(&self, key: &str, value: &str) -> PoolResult<()>;
    /// 全オプションを取得
    async fn list_options(&self) -> PoolResult<Vec<(String, String)>>;
}

// ---------------------------------------------------------------------------
// UserRepository
// ---------------------------------------------------------------------------

/// ユーザー・トークンのRepository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザーを作成
    async fn create_user(
        &self,
        username: &str,
        role: Role,
        email: &str,
        access_token: Option<&str>,
    ) -> PoolResult<User>;
    /// 管理API用アクセストークンでユーザーを取得
    async fn find_by_access_token(&self, access_token: &str) -> PoolResult<Option<User>>;
    /// 最初のルートユーザーのメールアドレス
    async fn find_root_email(&self) -> PoolResult<Option<String>>;
    /// リレー用トークンを登録
    async fn create_token(&self, user_id: i64, name: &str, key: &str) -> PoolResult<i64>;
    /// リレー用トークンの所有者を取得
    async fn find_token_owner(&self, key: &str) -> PoolResult<Option<User>>;
}

// ---------------------------------------------------------------------------
// SqlitePool implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl ChannelRepository for SqlitePool {
    async fn create_channel(&self, channel: &Channel) -> PoolResult<i64> {
        super::channels::create_channel(self, channel)
            .await
            .map_err(db_error("Failed to create channel"))
    }

    async fn create_channels(&self, channels: &[Channel]) -> PoolResult<Vec<i64>> {
        super::channels::create_channels(self, channels)
            .await
            .map_err(db_error("Failed to create channels"))
    }

    async fn list_channels(&self, offset: i64, limit: i64) -> PoolResult<Vec<Channel>> {
        super::channels::list_channels(self, offset, limit)
            .await
            .map_err(db_error("Failed to list channels"))
    }

    async fn list_all_channels(&self) -> PoolResult<Vec<Channel>> {
        super::channels::list_all_channels(self)
            .await
            .map_err(db_error("Failed to list channels"))
    }

    async fn search_channels(&self, keyword: &str) -> PoolResult<Vec<Channel>> {
        super::channels::search_channels(self, keyword)
            .await
            .map_err(db_error("Failed to search channels"))
    }

    async fn get_channel(&self, id: i64, with_credential: bool) -> PoolResult<Channel> {
        super::channels::get_channel(self, id, with_credential)
            .await
            .map_err(db_error("Failed to get channel"))?
            .ok_or(PoolError::NotFound(id))
    }

    async fn pick_random_enabled(&self) -> PoolResult<Channel> {
        super::channels::pick_random_enabled(self)
            .await
            .map_err(db_error("Failed to pick channel"))?
            .ok_or(PoolError::NoHealthyChannel)
    }

    async fn update_channel(&self, update: &ChannelUpdate) -> PoolResult<()> {
        let found = super::channels::update_channel(self, update)
            .await
            .map_err(db_error("Failed to update channel"))?;
        require_found(update.id, found)
    }

    async fn update_probe_result(
        &self,
        id: i64,
        latency_ms: i64,
        tested_at: i64,
    ) -> PoolResult<()> {
        let found = super::channels::update_probe_result(self, id, latency_ms, tested_at)
            .await
            .map_err(db_error("Failed to record probe result"))?;
        require_found(id, found)
    }

    async fn update_status(&self, id: i64, status: ChannelStatus) -> PoolResult<()> {
        let found = super::channels::update_status(self, id, status)
            .await
            .map_err(db_error("Failed to update channel status"))?;
        require_found(id, found)
    }

    async fn update_balance(&self, id: i64, balance: f64, updated_at: i64) -> PoolResult<()> {
        let found = super::channels::update_balance(self, id, balance, updated_at)
            .await
            .map_err(db_error("Failed to update channel balance"))?;
        require_found(id, found)
    }

    async fn delete_channel(&self, id: i64) -> PoolResult<()> {
        let found = super::channels::delete_channel(self, id)
            .await
            .map_err(db_error("Failed to delete channel"))?;
        require_found(id, found)
    }
}

#[async_trait]
impl OptionRepository for SqlitePool {
    async fn get_option(&self, key: &str) -> PoolResult<Option<String>> {
        super::options::get_option(self, key)
            .await
            .map_err(db_error("Failed to get option"))
    }

    async fn set_option(&self, key: &str, value: &str) -> PoolResult<()> {
        super::options::set_option(self, key, value)
            .await
            .map_err(db_error("Failed to set option"))
    }

    async fn list_options(&self) -> PoolResult<Vec<(String, String)>> {
        super::options::list_options(self)
            .await
            .map_err(db_error("Failed to list options"))
    }
}

#[async_trait]
impl UserRepository for SqlitePool {
    async fn create_user(
        &self,
        username: &str,
        role: Role,
        email: &str,
        access_token: Option<&str>,
    ) -> PoolResult<User> {
        super::users::create(self, username, role, email, access_token)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    PoolError::Validation(format!("User '{}' already exists", username))
                } else {
                    PoolError::Database(format!("Failed to create user: {}", e))
                }
            })
    }

    async fn find_by_access_token(&self, access_token: &str) -> PoolResult<Option<User>> {
        super::users::find_by_access_token(self, access_token)
            .await
            .map_err(db_error("Failed to find user"))
    }

    async fn find_root_email(&self) -> PoolResult<Option<String>> {
        super::users::find_root_email(self)
            .await
            .map_err(db_error("Failed to find root email"))
    }

    async fn create_token(&self, user_id: i64, name: &str, key: &str) -> PoolResult<i64> {
        super::tokens::create(self, user_id, name, key)
            .await
            .map_err(db_error("Failed to create token"))
    }

    async fn find_token_owner(&self, key: &str) -> PoolResult<Option<User>> {
        super::tokens::find_owner(self, key)
            .await
            .map_err(db_error("Failed to find token"))
    }
}
