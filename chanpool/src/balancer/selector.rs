//! チャネル選択
//!
//! リレー経路から1リクエストごとに呼ばれる。永続化済みの `status` だけを見て選び、
//! 同期的なプローブは行わない。

use crate::common::error::PoolResult;
use crate::db::traits::ChannelRepository;
use crate::types::channel::Channel;
use std::sync::Arc;
use tracing::debug;

/// チャネルセレクター
#[derive(Clone)]
pub struct ChannelSelector {
    store: Arc<dyn ChannelRepository>,
}

impl ChannelSelector {
    /// ストアを指定して作成
    pub fn new(store: Arc<dyn ChannelRepository>) -> Self {
        Self { store }
    }

    /// 1件選ぶ
    ///
    /// ピン指定があればそのIDを状態に関係なく返す（存在しなければ `NotFound`）。
    /// 指定がなければ有効チャネルから一様ランダムに選ぶ（空なら `NoHealthyChannel`）。
    /// ピン権限の確認は呼び出し側の責務。
    pub async fn select(&self, pinned: Option<i64>) -> PoolResult<Channel> {
        let channel = match pinned {
            Some(id) => self.store.get_channel(id, true).await?,
            None => self.store.pick_random_enabled().await?,
        };

        debug!(
            channel_id = channel.id,
            pinned = pinned.is_some(),
            "Selected channel"
        );
        Ok(channel)
    }
}
