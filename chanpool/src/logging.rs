//! ロギング初期化ユーティリティ
//!
//! 標準出力と日次ローテーションのファイル（`~/.chanpool/logs`）の両方に出力する。

use crate::config::{data_dir, get_env_with_fallback};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ファイル出力のフラッシュ用ガード（プロセス終了まで保持）
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const LOG_FILE_PREFIX: &str = "chanpool.log";

/// フィルタ指定を決める
///
/// `CHANPOOL_LOG_LEVEL` → `RUST_LOG` → `info`。sqlxの指定が無ければクエリログを抑える。
fn filter_directive() -> String {
    let directive = get_env_with_fallback("CHANPOOL_LOG_LEVEL", "RUST_LOG")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    if directive.contains("sqlx") {
        directive
    } else {
        format!("{},sqlx=warn", directive)
    }
}

/// ログ出力ディレクトリ
pub fn log_dir() -> PathBuf {
    get_env_with_fallback("CHANPOOL_LOG_DIR", "LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("logs"))
}

/// tracingサブスクライバを初期化する
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive()).unwrap_or_else(|_| EnvFilter::new("info"));

    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).compact())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    let _ = LOG_GUARD.set(guard);
    tracing::debug!(log_dir = %dir.display(), "Logging initialized");
    Ok(())
}
