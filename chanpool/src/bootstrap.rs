//! サーバー初期化ロジック
//!
//! データベース接続、マイグレーション、ルートユーザー作成、通知先の選択、
//! 定期スイープの起動など、サーバー起動に必要なコンポーネントを初期化する。

use crate::common::error::{PoolError, PoolResult};
use crate::config::PoolConfig;
use crate::health::SweepScheduler;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier, DEFAULT_NOTIFY_TIMEOUT_SECS};
use crate::shutdown::ShutdownController;
use crate::{auth, db, AppState};
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// リレー要求全体のタイムアウト（秒）
pub const RELAY_TIMEOUT_SECS: u64 = 600;

/// サーバー初期化を実行する
///
/// 定期スイープが有効なら、ここでバックグラウンド起動する。
pub async fn initialize(config: PoolConfig, shutdown: ShutdownController) -> PoolResult<AppState> {
    info!("Channel pool v{}", env!("CARGO_PKG_VERSION"));

    let db_pool = init_db_pool(&config.database_url)
        .await
        .map_err(|e| PoolError::Database(format!("Failed to connect to database: {}", e)))?;
    db::migrations::run_migrations(&db_pool).await?;

    auth::bootstrap::create_root_from_env(&db_pool, &config).await?;

    // リレー用HTTPクライアント（接続プーリング有効）
    let http_client = reqwest::Client::builder()
        .pool_max_idle_per_host(32)
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .timeout(Duration::from_secs(RELAY_TIMEOUT_SECS))
        .build()
        .map_err(|e| PoolError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!(url = %url, "Operator notifications via webhook");
            Arc::new(WebhookNotifier::new(
                url.clone(),
                Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
            )?)
        }
        None => {
            info!("Operator notifications are written to the log only");
            Arc::new(LogNotifier)
        }
    };

    let sweep_interval = config.sweep_interval;
    let state = AppState::new(
        db_pool,
        config,
        notifier,
        http_client,
        shutdown.clone(),
    )?;

    SweepScheduler::new(state.sweep.clone(), sweep_interval, shutdown).start();

    Ok(state)
}

/// SQLite接続プールを初期化する
pub async fn init_db_pool(database_url: &str) -> sqlx::Result<sqlx::SqlitePool> {
    // SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        // `sqlite::memory:` のような特殊指定はスキップ
        if !path.starts_with(':') {
            let normalized = path.trim_start_matches("//");
            let path_without_params = normalized.split('?').next().unwrap_or(normalized);
            if let Some(parent) = std::path::Path::new(path_without_params).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    sqlx::SqlitePool::connect_with(connect_options).await
}
