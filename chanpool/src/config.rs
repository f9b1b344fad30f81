//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs, and `PoolConfig` which
//! gathers every setting the server needs at startup.

use crate::health::probe::DEFAULT_PROBE_TIMEOUT_SECS;
use std::path::PathBuf;
use std::time::Duration;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use chanpool::config::get_env_with_fallback;
///
/// let port = get_env_with_fallback("CHANPOOL_PORT", "PORT");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Returns `default` if neither is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// データディレクトリ（`~/.chanpool`）
///
/// HOME / USERPROFILE が無い環境ではカレントディレクトリ配下を使う。
pub fn data_dir() -> PathBuf {
    match std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        Ok(home) => PathBuf::from(home).join(".chanpool"),
        Err(_) => PathBuf::from(".chanpool"),
    }
}

/// サーバー全体の設定
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// SQLiteのURL
    pub database_url: String,
    /// 待ち受けホスト
    pub host: String,
    /// 待ち受けポート
    pub port: u16,
    /// プローブのタイムアウト
    pub probe_timeout: Duration,
    /// 定期スイープの間隔（0なら無効）
    pub sweep_interval: Duration,
    /// オペレーター通知先（未設定なら遅延解決）
    pub operator_address: Option<String>,
    /// 通知Webhook（未設定ならログのみ）
    pub notify_webhook_url: Option<String>,
    /// オプション未設定時の無効化しきい値（秒、0で無効）
    pub disable_threshold_secs: f64,
    /// 起動時に作成するルートユーザーのアクセストークン
    pub root_access_token: Option<String>,
    /// 起動時に作成するルートユーザーのメールアドレス
    pub root_email: Option<String>,
    /// 起動時にルートユーザーへ登録するリレー用キー（`sk-` 以降）
    pub root_relay_key: Option<String>,
}

impl PoolConfig {
    /// 環境変数から読み込む
    pub fn from_env() -> Self {
        let database_url = get_env_with_fallback("CHANPOOL_DATABASE_URL", "DATABASE_URL")
            .unwrap_or_else(|| format!("sqlite:{}", data_dir().join("chanpool.db").display()));

        let probe_timeout_secs = get_env_with_fallback_parse(
            "CHANPOOL_PROBE_TIMEOUT_SECS",
            "PROBE_TIMEOUT_SECS",
            DEFAULT_PROBE_TIMEOUT_SECS,
        );
        let sweep_interval_secs = get_env_with_fallback_parse(
            "CHANPOOL_SWEEP_INTERVAL_SECS",
            "CHANNEL_TEST_FREQUENCY",
            0u64,
        );

        Self {
            database_url,
            host: get_env_with_fallback_or("CHANPOOL_HOST", "HOST", "0.0.0.0"),
            port: get_env_with_fallback_parse("CHANPOOL_PORT", "PORT", 3000u16),
            probe_timeout: Duration::from_secs(probe_timeout_secs.max(1)),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            operator_address: non_empty(get_env_with_fallback(
                "CHANPOOL_OPERATOR_ADDRESS",
                "ROOT_USER_EMAIL",
            )),
            notify_webhook_url: non_empty(get_env_with_fallback(
                "CHANPOOL_NOTIFY_WEBHOOK_URL",
                "NOTIFY_WEBHOOK_URL",
            )),
            disable_threshold_secs: get_env_with_fallback_parse(
                "CHANPOOL_CHANNEL_DISABLE_THRESHOLD",
                "CHANNEL_DISABLE_THRESHOLD",
                0.0f64,
            ),
            root_access_token: non_empty(get_env_with_fallback(
                "CHANPOOL_ROOT_ACCESS_TOKEN",
                "ROOT_ACCESS_TOKEN",
            )),
            root_email: non_empty(get_env_with_fallback("CHANPOOL_ROOT_EMAIL", "ROOT_EMAIL")),
            root_relay_key: non_empty(get_env_with_fallback(
                "CHANPOOL_ROOT_RELAY_KEY",
                "ROOT_RELAY_KEY",
            )),
        }
    }

    /// `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
