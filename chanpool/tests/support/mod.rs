//! 結合テスト用の共通ヘルパー

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chanpool::common::error::{PoolError, PoolResult};
use chanpool::config::PoolConfig;
use chanpool::db::traits::{ChannelRepository, OptionRepository, UserRepository};
use chanpool::health::{ChannelProber, SweepCoordinator};
use chanpool::notify::{Notifier, OperatorAddress};
use chanpool::shutdown::ShutdownController;
use chanpool::types::channel::{Channel, ChannelKind, ChannelStatus, ChannelUpdate};
use chanpool::types::user::Role;
use chanpool::{api, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// テスト用のSQLiteデータベースプールを作成する
pub async fn create_test_db_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    chanpool::db::migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// 送信された通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub to: String,
    pub subject: String,
    pub content: String,
}

/// 送信内容を記録する通知先
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, content: &str) -> PoolResult<()> {
        self.sent.lock().unwrap().push(SentNotification {
            to: to.to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}

/// 送信時にパニックする通知先
pub struct PanickingNotifier;

#[async_trait]
impl Notifier for PanickingNotifier {
    async fn send(&self, _to: &str, _subject: &str, _content: &str) -> PoolResult<()> {
        panic!("notifier exploded");
    }
}

/// ステータス更新だけ失敗するストア
pub struct StatusWriteFailingStore {
    pub inner: SqlitePool,
}

#[async_trait]
impl ChannelRepository for StatusWriteFailingStore {
    async fn create_channel(&self, channel: &Channel) -> PoolResult<i64> {
        self.inner.create_channel(channel).await
    }

    async fn create_channels(&self, channels: &[Channel]) -> PoolResult<Vec<i64>> {
        self.inner.create_channels(channels).await
    }

    async fn list_channels(&self, offset: i64, limit: i64) -> PoolResult<Vec<Channel>> {
        self.inner.list_channels(offset, limit).await
    }

    async fn list_all_channels(&self) -> PoolResult<Vec<Channel>> {
        self.inner.list_all_channels().await
    }

    async fn search_channels(&self, keyword: &str) -> PoolResult<Vec<Channel>> {
        self.inner.search_channels(keyword).await
    }

    async fn get_channel(&self, id: i64, with_credential: bool) -> PoolResult<Channel> {
        self.inner.get_channel(id, with_credential).await
    }

    async fn pick_random_enabled(&self) -> PoolResult<Channel> {
        self.inner.pick_random_enabled().await
    }

    async fn update_channel(&self, update: &ChannelUpdate) -> PoolResult<()> {
        self.inner.update_channel(update).await
    }

    async fn update_probe_result(
        &self,
        id: i64,
        latency_ms: i64,
        tested_at: i64,
    ) -> PoolResult<()> {
        self.inner
            .update_probe_result(id, latency_ms, tested_at)
            .await
    }

    async fn update_status(&self, _id: i64, _status: ChannelStatus) -> PoolResult<()> {
        Err(PoolError::Database("disk I/O error".to_string()))
    }

    async fn update_balance(&self, id: i64, balance: f64, updated_at: i64) -> PoolResult<()> {
        self.inner.update_balance(id, balance, updated_at).await
    }

    async fn delete_channel(&self, id: i64) -> PoolResult<()> {
        self.inner.delete_channel(id).await
    }
}

/// 上流URLを指すCustomチャネル
pub fn custom_channel(name: &str, base_url: &str) -> Channel {
    Channel::new(ChannelKind::Custom, name, format!("sk-{}", name)).with_base_url(base_url)
}

/// スイープコーディネーターを組み立てる
pub fn build_coordinator(
    store: Arc<dyn ChannelRepository>,
    pool: &SqlitePool,
    notifier: Arc<dyn Notifier>,
    fallback_threshold_secs: f64,
) -> SweepCoordinator {
    let options: Arc<dyn OptionRepository> = Arc::new(pool.clone());
    let users: Arc<dyn UserRepository> = Arc::new(pool.clone());
    SweepCoordinator::new(
        store,
        options.clone(),
        ChannelProber::new(Duration::from_secs(5)).expect("prober"),
        notifier,
        Arc::new(OperatorAddress::new(
            Some("ops@example.com".to_string()),
            options,
            users,
        )),
        fallback_threshold_secs,
    )
}

/// テスト用の設定
pub fn test_config() -> PoolConfig {
    PoolConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        probe_timeout: Duration::from_secs(5),
        sweep_interval: Duration::ZERO,
        operator_address: Some("ops@example.com".to_string()),
        notify_webhook_url: None,
        disable_threshold_secs: 0.0,
        root_access_token: None,
        root_email: None,
        root_relay_key: None,
    }
}

/// テスト用のアプリケーション（.oneshot()スタイルのテスト用）
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: SqlitePool,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn create_test_app() -> TestApp {
    let pool = create_test_db_pool().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(
        pool.clone(),
        test_config(),
        notifier.clone(),
        reqwest::Client::new(),
        ShutdownController::default(),
    )
    .expect("Failed to build app state");

    TestApp {
        router: api::create_app(state.clone()),
        state,
        pool,
        notifier,
    }
}

/// 管理APIアクセストークン付きのユーザーを作成する
pub async fn create_user_with_token(pool: &SqlitePool, name: &str, role: Role) -> String {
    let token = format!("access-{}", name);
    pool.create_user(name, role, &format!("{}@example.com", name), Some(&token))
        .await
        .expect("Failed to create user");
    token
}

/// リレー用キーを持つユーザーを作成する（戻り値はキー本体）
pub async fn create_user_with_relay_key(pool: &SqlitePool, name: &str, role: Role) -> String {
    let user = pool
        .create_user(name, role, "", None)
        .await
        .expect("Failed to create user");
    let key = format!("relay{}", name);
    pool.create_token(user.id, "default", &key)
        .await
        .expect("Failed to create token");
    key
}
