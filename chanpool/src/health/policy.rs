//! 無効化・通知ポリシー
//!
//! `decide` は副作用のない判定。`enforce_disable` が判定結果を永続化と通知に反映する。

use crate::db::options::CHANNEL_DISABLE_THRESHOLD;
use crate::db::traits::{ChannelRepository, OptionRepository};
use crate::notify::{notify_best_effort, Notifier};
use crate::types::channel::{Channel, ChannelStatus, ProbeOutcome};
use tracing::warn;

/// しきい値未設定時に使う、事実上到達しないしきい値（ミリ秒）
pub const UNREACHABLE_THRESHOLD_MS: i64 = 10_000_000;

/// スイープ完了通知の件名
pub const SWEEP_SUMMARY_SUBJECT: &str = "Channel test complete";

/// スイープ完了通知の本文
pub const SWEEP_SUMMARY_CONTENT: &str =
    "All channels have been tested. If you did not receive a disable notification, every channel is healthy.";

/// 判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// 現状維持
    Keep,
    /// ローテーションから外す
    Disable {
        /// 理由（通知本文に入る）
        reason: String,
    },
}

fn effective_threshold(threshold_ms: i64) -> i64 {
    if threshold_ms <= 0 {
        UNREACHABLE_THRESHOLD_MS
    } else {
        threshold_ms
    }
}

/// プローブ結果から無効化するかを判定する
///
/// レイテンシ超過はプローブ成否に関係なく無効化し、理由文ではそちらを優先する。
/// `threshold_ms` が0以下ならレイテンシでは無効化しない。
pub fn decide(outcome: &ProbeOutcome, latency_ms: i64, threshold_ms: i64) -> Decision {
    let threshold_ms = effective_threshold(threshold_ms);

    if latency_ms > threshold_ms {
        return Decision::Disable {
            reason: format!(
                "response time {:.2}s exceeded threshold {:.2}s",
                latency_ms as f64 / 1000.0,
                threshold_ms as f64 / 1000.0
            ),
        };
    }

    if !outcome.success {
        let reason = outcome.error_text();
        return Decision::Disable {
            reason: if reason.is_empty() {
                "probe failed".to_string()
            } else {
                reason
            },
        };
    }

    Decision::Keep
}

/// レイテンシしきい値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisablePolicy {
    threshold_ms: i64,
}

impl DisablePolicy {
    /// 秒単位のしきい値から作成（0以下は無効）
    pub fn from_seconds(seconds: f64) -> Self {
        let threshold_ms = if seconds.is_finite() && seconds > 0.0 {
            (seconds * 1000.0).round() as i64
        } else {
            0
        };
        Self { threshold_ms }
    }

    /// オプション `ChannelDisableThreshold` から読み込む
    ///
    /// 未設定・読めない値のときは `fallback_seconds` を使う。
    pub async fn load(options: &dyn OptionRepository, fallback_seconds: f64) -> Self {
        let seconds = match options.get_option(CHANNEL_DISABLE_THRESHOLD).await {
            Ok(Some(raw)) => raw.trim().parse::<f64>().unwrap_or_else(|_| {
                warn!(value = %raw, "Invalid ChannelDisableThreshold option, using default");
                fallback_seconds
            }),
            Ok(None) => fallback_seconds,
            Err(e) => {
                warn!(error = %e, "Failed to read ChannelDisableThreshold option");
                fallback_seconds
            }
        };
        Self::from_seconds(seconds)
    }

    /// 判定に使う実効しきい値（ミリ秒）
    pub fn threshold_ms(&self) -> i64 {
        effective_threshold(self.threshold_ms)
    }

    /// レイテンシによる無効化が有効か
    pub fn latency_check_enabled(&self) -> bool {
        self.threshold_ms > 0
    }

    /// この方針で判定する
    pub fn decide(&self, outcome: &ProbeOutcome) -> Decision {
        decide(outcome, outcome.latency_ms, self.threshold_ms)
    }
}

/// 無効化通知の件名
pub fn disable_subject(channel: &Channel) -> String {
    format!("channel「{}」（#{}）has been disabled", channel.name, channel.id)
}

/// 無効化通知の本文
pub fn disable_content(channel: &Channel, reason: &str) -> String {
    format!(
        "channel「{}」（#{}）has been disabled, reason: {}",
        channel.name, channel.id, reason
    )
}

/// 無効化を反映する
///
/// ステータスを永続化し、続けて通知する。どちらの失敗もログに残すだけで呼び出し元には返さない。
pub async fn enforce_disable(
    store: &dyn ChannelRepository,
    notifier: &dyn Notifier,
    operator_address: &str,
    channel: &Channel,
    reason: &str,
) {
    if let Err(e) = store.update_status(channel.id, ChannelStatus::Disabled).await {
        warn!(
            channel_id = channel.id,
            channel_name = %channel.name,
            error = %e,
            "Failed to persist channel disable"
        );
    }

    notify_best_effort(
        notifier,
        operator_address,
        &disable_subject(channel),
        &disable_content(channel, reason),
    )
    .await;
}
