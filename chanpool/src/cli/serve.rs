//! serve サブコマンド
//!
//! チャネルプールサーバーを起動します。未指定の項目は環境変数の設定を使います。

use clap::Args;

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long, default_value = "3000", env = "CHANPOOL_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "CHANPOOL_HOST")]
    pub host: String,

    /// Database URL (overrides CHANPOOL_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Scheduled sweep interval in seconds, 0 disables (overrides CHANPOOL_SWEEP_INTERVAL_SECS)
    #[arg(long)]
    pub sweep_interval: Option<u64>,
}

impl ServeArgs {
    /// 環境変数から読んだ設定に引数を重ねる
    pub fn apply(self, config: &mut crate::config::PoolConfig) {
        config.host = self.host;
        config.port = self.port;
        if let Some(url) = self.database_url.filter(|url| !url.trim().is_empty()) {
            config.database_url = url;
        }
        if let Some(secs) = self.sweep_interval {
            config.sweep_interval = std::time::Duration::from_secs(secs);
        }
    }
}
