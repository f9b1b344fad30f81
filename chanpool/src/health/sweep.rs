//! チャネルスイープ
//!
//! プール全体のヘルスチェックを同時に1本だけ実行する。
//! 実行中フラグの確認と設定だけをロック下で行い、本体は切り離したタスクで進める。

use crate::common::error::{PoolError, PoolResult};
use crate::db::traits::{ChannelRepository, OptionRepository};
use crate::health::policy::{
    enforce_disable, Decision, DisablePolicy, SWEEP_SUMMARY_CONTENT, SWEEP_SUMMARY_SUBJECT,
};
use crate::health::probe::{ChannelProber, ProbeRequest};
use crate::notify::{notify_best_effort, Notifier, OperatorAddress};
use crate::types::channel::{Channel, RESPONSE_TIME_UNMEASURED};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 1回のスイープの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// プローブしたチャネル数
    pub probed: usize,
    /// 無効化したチャネル数
    pub disabled: usize,
    /// 有効でないためスキップしたチャネル数
    pub skipped: usize,
}

/// 単一チャネルテストの結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelTestReport {
    /// 成功したか
    pub success: bool,
    /// 失敗理由（成功時は空文字）
    pub message: String,
    /// 経過秒数
    pub elapsed_seconds: f64,
}

/// 受理されたスイープ
///
/// 破棄してもスイープは止まらない。テストや呼び出し元が完了を待つときだけ `wait` を使う。
#[derive(Debug)]
pub struct SweepHandle {
    handle: JoinHandle<SweepSummary>,
}

impl SweepHandle {
    /// スイープの完了を待つ
    pub async fn wait(self) -> PoolResult<SweepSummary> {
        self.handle
            .await
            .map_err(|e| PoolError::Internal(format!("Channel sweep task failed: {}", e)))
    }
}

struct SweepInner {
    store: Arc<dyn ChannelRepository>,
    options: Arc<dyn OptionRepository>,
    prober: ChannelProber,
    notifier: Arc<dyn Notifier>,
    operator: Arc<OperatorAddress>,
    fallback_threshold_secs: f64,
    running: Mutex<bool>,
}

/// 実行中フラグの解放
///
/// スイープタスクが正常終了してもパニックしても、ドロップ時にフラグを戻す。
struct SweepGuard {
    inner: Arc<SweepInner>,
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        let mut running = self
            .inner
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *running = false;
    }
}

/// スイープコーディネーター
///
/// プロセスごとに1つ作って注入する。複製は同じ実行中フラグを共有する。
#[derive(Clone)]
pub struct SweepCoordinator {
    inner: Arc<SweepInner>,
}

impl SweepCoordinator {
    /// 作成
    ///
    /// `fallback_threshold_secs` はオプション `ChannelDisableThreshold` が無いときに使う。
    pub fn new(
        store: Arc<dyn ChannelRepository>,
        options: Arc<dyn OptionRepository>,
        prober: ChannelProber,
        notifier: Arc<dyn Notifier>,
        operator: Arc<OperatorAddress>,
        fallback_threshold_secs: f64,
    ) -> Self {
        Self {
            inner: Arc::new(SweepInner {
                store,
                options,
                prober,
                notifier,
                operator,
                fallback_threshold_secs,
                running: Mutex::new(false),
            }),
        }
    }

    /// スイープが実行中か
    pub fn is_running(&self) -> bool {
        *self
            .inner
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_acquire(&self) -> PoolResult<SweepGuard> {
        let mut running = self
            .inner
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *running {
            return Err(PoolError::AlreadyRunning);
        }
        *running = true;
        Ok(SweepGuard {
            inner: self.inner.clone(),
        })
    }

    /// プール全体のスイープを開始する
    ///
    /// 実行中なら待たずに `AlreadyRunning` を返す。チャネル一覧の取得までをここで行い、
    /// 失敗すればフラグを戻してエラーを返す。受理後の本体はバックグラウンドで進む。
    pub async fn run_sweep(&self, request: ProbeRequest) -> PoolResult<SweepHandle> {
        let guard = self.try_acquire()?;
        let channels = self.inner.store.list_all_channels().await?;
        let inner = self.inner.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            inner.sweep(channels, request).await
        });

        Ok(SweepHandle { handle })
    }

    /// 単一チャネルを同期的にテストする
    ///
    /// 無効化判定は行わない。レイテンシの記録は切り離して行う。
    pub async fn test_channel(
        &self,
        channel_id: i64,
        model_override: Option<&str>,
    ) -> PoolResult<ChannelTestReport> {
        let channel = self.inner.store.get_channel(channel_id, true).await?;
        let request = ProbeRequest::new(model_override);
        let outcome = self.inner.prober.probe(&channel, &request).await;

        let store = self.inner.store.clone();
        let latency_ms = outcome.latency_ms;
        tokio::spawn(async move {
            record_latency(store.as_ref(), channel_id, latency_ms).await;
        });

        if !outcome.success {
            warn!(
                channel_id,
                channel_name = %channel.name,
                latency_ms,
                error = %outcome.error_text(),
                "Channel test failed"
            );
        }

        Ok(ChannelTestReport {
            success: outcome.success,
            message: outcome.error_text(),
            elapsed_seconds: outcome.elapsed_seconds(),
        })
    }
}

impl SweepInner {
    async fn sweep(&self, channels: Vec<Channel>, request: ProbeRequest) -> SweepSummary {
        let mut summary = SweepSummary::default();
        let policy = DisablePolicy::load(self.options.as_ref(), self.fallback_threshold_secs).await;
        let operator_address = self.operator.resolve().await;

        info!(
            count = channels.len(),
            threshold_ms = policy.threshold_ms(),
            latency_check = policy.latency_check_enabled(),
            "Channel sweep started"
        );

        for channel in channels {
            if !channel.is_enabled() {
                debug!(channel_id = channel.id, "Skipping channel that is not enabled");
                summary.skipped += 1;
                continue;
            }
            summary.probed += 1;
            if self
                .check_channel(&channel, &request, &policy, &operator_address)
                .await
            {
                summary.disabled += 1;
            }
        }

        notify_best_effort(
            self.notifier.as_ref(),
            &operator_address,
            SWEEP_SUMMARY_SUBJECT,
            SWEEP_SUMMARY_CONTENT,
        )
        .await;

        info!(
            probed = summary.probed,
            disabled = summary.disabled,
            skipped = summary.skipped,
            "Channel sweep finished"
        );

        summary
    }

    /// 1チャネル分: プローブ → レイテンシ記録 → 判定 → 無効化と通知
    ///
    /// 無効化した場合に true
    async fn check_channel(
        &self,
        channel: &Channel,
        request: &ProbeRequest,
        policy: &DisablePolicy,
        operator_address: &str,
    ) -> bool {
        let outcome = self.prober.probe(channel, request).await;
        record_latency(self.store.as_ref(), channel.id, outcome.latency_ms).await;

        match policy.decide(&outcome) {
            Decision::Keep => false,
            Decision::Disable { reason } => {
                warn!(
                    channel_id = channel.id,
                    channel_name = %channel.name,
                    latency_ms = outcome.latency_ms,
                    reason = %reason,
                    "Disabling channel"
                );
                enforce_disable(
                    self.store.as_ref(),
                    self.notifier.as_ref(),
                    operator_address,
                    channel,
                    &reason,
                )
                .await;
                true
            }
        }
    }
}

/// レイテンシを記録（失敗はログのみ）
///
/// 送信前に失敗したプローブは計測値が無いので記録しない。
async fn record_latency(store: &dyn ChannelRepository, channel_id: i64, latency_ms: i64) {
    if latency_ms == RESPONSE_TIME_UNMEASURED {
        debug!(channel_id, "Probe never reached the upstream, keeping previous latency");
        return;
    }
    let tested_at = chrono::Utc::now().timestamp();
    if let Err(e) = store
        .update_probe_result(channel_id, latency_ms, tested_at)
        .await
    {
        warn!(
            channel_id,
            latency_ms,
            error = %e,
            "Failed to record probe result"
        );
    }
}
