//! 定期スイープ
//!
//! 一定間隔で `SweepCoordinator::run_sweep` を起動する。
//! 前回のスイープが終わっていなければその回は見送る。

use crate::common::error::PoolError;
use crate::health::probe::ProbeRequest;
use crate::health::sweep::SweepCoordinator;
use crate::shutdown::ShutdownController;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// 定期スイープのスケジューラ
pub struct SweepScheduler {
    coordinator: SweepCoordinator,
    period: Duration,
    shutdown: ShutdownController,
}

impl SweepScheduler {
    /// 作成
    pub fn new(coordinator: SweepCoordinator, period: Duration, shutdown: ShutdownController) -> Self {
        Self {
            coordinator,
            period,
            shutdown,
        }
    }

    /// バックグラウンドで開始（間隔0なら何もしない）
    pub fn start(self) -> Option<JoinHandle<()>> {
        if self.period.is_zero() {
            info!("Scheduled channel sweep is disabled");
            return None;
        }
        Some(tokio::spawn(self.run()))
    }

    async fn run(self) {
        let mut timer = interval(self.period);

        info!(
            interval_secs = self.period.as_secs_f64(),
            "Scheduled channel sweep started"
        );

        // 最初のtickは即時に返るので、1間隔待ってから初回スイープする
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => self.trigger().await,
                _ = self.shutdown.wait() => {
                    info!("Scheduled channel sweep stopped");
                    break;
                }
            }
        }
    }

    async fn trigger(&self) {
        match self.coordinator.run_sweep(ProbeRequest::default()).await {
            Ok(_) => debug!("Scheduled channel sweep accepted"),
            Err(PoolError::AlreadyRunning) => {
                debug!("Previous channel sweep still running, skipping this tick")
            }
            Err(e) => warn!(error = %e, "Failed to start scheduled channel sweep"),
        }
    }
}
