//! オペレーター通知
//!
//! 通知の失敗は呼び出し元の処理を止めない。`notify_best_effort` がログに残して握りつぶす。

use crate::common::error::{PoolError, PoolResult};
use crate::db::options::ROOT_USER_EMAIL;
use crate::db::traits::{OptionRepository, UserRepository};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// 通知の送信先
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 1件の通知を送る
    async fn send(&self, to: &str, subject: &str, content: &str) -> PoolResult<()>;
}

/// ログにだけ出力する通知先（送信先未設定時の既定）
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, content: &str) -> PoolResult<()> {
        info!(to = %to, subject = %subject, content = %content, "Operator notification");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    subject: &'a str,
    content: &'a str,
}

/// Webhook送信のタイムアウト（秒）
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// JSONをPOSTするWebhook通知先
///
/// スイープ中に呼ばれるため、応答しない送信先でもタイムアウトで必ず戻る。
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// Webhook URLとタイムアウトを指定して作成
    pub fn new(url: impl Into<String>, timeout: Duration) -> PoolResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::Config(format!("Failed to create webhook client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, to: &str, subject: &str, content: &str) -> PoolResult<()> {
        let payload = WebhookPayload {
            to,
            subject,
            content,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PoolError::Notification(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PoolError::Notification(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// 通知を送り、失敗はwarnログに留める
pub async fn notify_best_effort(notifier: &dyn Notifier, to: &str, subject: &str, content: &str) {
    if let Err(e) = notifier.send(to, subject, content).await {
        warn!(
            to = %to,
            subject = %subject,
            error = %e,
            "Failed to send operator notification"
        );
    }
}

/// オペレーター通知先アドレスの解決
///
/// 優先順: オプション `RootUserEmail` → 起動時設定 → 最初のルートユーザーのメール。
/// ユーザーストアから引いた値だけをキャッシュする。
pub struct OperatorAddress {
    configured: Option<String>,
    options: Arc<dyn OptionRepository>,
    users: Arc<dyn UserRepository>,
    cached: RwLock<Option<String>>,
}

impl OperatorAddress {
    /// 作成
    pub fn new(
        configured: Option<String>,
        options: Arc<dyn OptionRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            configured: configured.filter(|s| !s.trim().is_empty()),
            options,
            users,
            cached: RwLock::new(None),
        }
    }

    /// 通知先を解決（見つからなければ空文字）
    pub async fn resolve(&self) -> String {
        match self.options.get_option(ROOT_USER_EMAIL).await {
            Ok(Some(address)) if !address.trim().is_empty() => return address,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read operator address option"),
        }

        if let Some(address) = &self.configured {
            return address.clone();
        }

        if let Some(address) = self.cached.read().await.as_ref() {
            return address.clone();
        }

        match self.users.find_root_email().await {
            Ok(Some(address)) => {
                *self.cached.write().await = Some(address.clone());
                address
            }
            Ok(None) => {
                warn!("No operator address configured; notifications have no recipient");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve operator address");
                String::new()
            }
        }
    }
}
