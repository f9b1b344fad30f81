//! Channel pool manager
//!
//! チャットコンプリーションプロキシの上流チャネルを管理するサーバー。
//! チャネルの選択、プローブ、自動無効化と通知、プール全体スイープの排他を担う。

#![warn(missing_docs)]

/// 共通型定義（エラー、レスポンスエンベロープ）
pub mod common;

/// REST APIハンドラー
pub mod api;

/// チャネル選択
pub mod balancer;

/// サーバー初期化
pub mod bootstrap;

/// チャネルヘルスチェック（プローブ、ポリシー、スイープ）
pub mod health;

/// データベースアクセス
pub mod db;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// 認証・認可機能
pub mod auth;

/// CLIインターフェース
pub mod cli;

/// オペレーター通知
pub mod notify;

/// axumサーバー起動・シャットダウン
pub mod server;

/// 協調シャットダウン
pub mod shutdown;

/// 型定義
pub mod types;

use crate::balancer::ChannelSelector;
use crate::common::error::PoolResult;
use crate::config::PoolConfig;
use crate::db::traits::{ChannelRepository, OptionRepository, UserRepository};
use crate::health::{ChannelProber, SweepCoordinator};
use crate::notify::{Notifier, OperatorAddress};
use crate::shutdown::ShutdownController;
use sqlx::SqlitePool;
use std::sync::Arc;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// データベース接続プール
    pub db_pool: SqlitePool,
    /// 設定
    pub config: Arc<PoolConfig>,
    /// チャネルストア
    pub store: Arc<dyn ChannelRepository>,
    /// オプションストア
    pub options: Arc<dyn OptionRepository>,
    /// ユーザー・トークンストア
    pub users: Arc<dyn UserRepository>,
    /// チャネルセレクター
    pub selector: ChannelSelector,
    /// スイープコーディネーター（プロセスに1つ）
    pub sweep: SweepCoordinator,
    /// リレー用HTTPクライアント
    pub http_client: reqwest::Client,
    /// シャットダウンコントローラー
    pub shutdown: ShutdownController,
}

impl AppState {
    /// SQLiteプールを全ストアとして使う状態を組み立てる
    pub fn new(
        db_pool: SqlitePool,
        config: PoolConfig,
        notifier: Arc<dyn Notifier>,
        http_client: reqwest::Client,
        shutdown: ShutdownController,
    ) -> PoolResult<Self> {
        let store: Arc<dyn ChannelRepository> = Arc::new(db_pool.clone());
        let options: Arc<dyn OptionRepository> = Arc::new(db_pool.clone());
        let users: Arc<dyn UserRepository> = Arc::new(db_pool.clone());

        let operator = Arc::new(OperatorAddress::new(
            config.operator_address.clone(),
            options.clone(),
            users.clone(),
        ));
        let sweep = SweepCoordinator::new(
            store.clone(),
            options.clone(),
            ChannelProber::new(config.probe_timeout)?,
            notifier,
            operator,
            config.disable_threshold_secs,
        );

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            selector: ChannelSelector::new(store.clone()),
            store,
            options,
            users,
            sweep,
            http_client,
            shutdown,
        })
    }
}
