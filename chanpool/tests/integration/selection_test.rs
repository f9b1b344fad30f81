//! Integration Test: チャネル選択
//!
//! 有効なチャネルだけが選ばれること、ピン留め、空プールを確認する。

use chanpool::balancer::ChannelSelector;
use chanpool::common::error::PoolError;
use chanpool::db::traits::ChannelRepository;
use chanpool::types::channel::{Channel, ChannelKind, ChannelStatus};
use std::collections::HashMap;
use std::sync::Arc;

use crate::support::create_test_db_pool;

async fn seed(pool: &sqlx::SqlitePool) -> (Vec<i64>, Vec<i64>) {
    let mut enabled = Vec::new();
    let mut disabled = Vec::new();
    for i in 0..3 {
        enabled.push(
            pool.create_channel(&Channel::new(ChannelKind::OpenAi, format!("on-{}", i), "k"))
                .await
                .unwrap(),
        );
    }
    for i in 0..2 {
        disabled.push(
            pool.create_channel(
                &Channel::new(ChannelKind::OpenAi, format!("off-{}", i), "k")
                    .with_status(ChannelStatus::Disabled),
            )
            .await
            .unwrap(),
        );
    }
    (enabled, disabled)
}

#[tokio::test]
async fn random_selection_only_returns_enabled_channels() {
    let pool = create_test_db_pool().await;
    let (enabled, disabled) = seed(&pool).await;
    let selector = ChannelSelector::new(Arc::new(pool));

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for _ in 0..1000 {
        let channel = selector.select(None).await.unwrap();
        assert!(channel.is_enabled());
        assert!(!disabled.contains(&channel.id));
        assert_eq!(channel.credential.as_deref(), Some("k"));
        *counts.entry(channel.id).or_default() += 1;
    }

    // 3チャネルとも選ばれている（1000回で一度も選ばれない確率は無視できる）
    for id in enabled {
        assert!(counts.get(&id).copied().unwrap_or(0) > 0, "channel {} never picked", id);
    }
}

#[tokio::test]
async fn pinned_channel_is_returned_even_if_disabled() {
    let pool = create_test_db_pool().await;
    let (_, disabled) = seed(&pool).await;
    let selector = ChannelSelector::new(Arc::new(pool));

    let channel = selector.select(Some(disabled[0])).await.unwrap();
    assert_eq!(channel.id, disabled[0]);
    assert_eq!(channel.status, ChannelStatus::Disabled);
    assert_eq!(channel.credential.as_deref(), Some("k"));
}

#[tokio::test]
async fn unknown_pin_is_not_found() {
    let pool = create_test_db_pool().await;
    seed(&pool).await;
    let selector = ChannelSelector::new(Arc::new(pool));

    let err = selector.select(Some(9999)).await.unwrap_err();
    assert!(matches!(err, PoolError::NotFound(9999)));
}

#[tokio::test]
async fn pool_without_enabled_channels_has_no_healthy_channel() {
    let pool = create_test_db_pool().await;
    pool.create_channel(
        &Channel::new(ChannelKind::OpenAi, "off", "k").with_status(ChannelStatus::Disabled),
    )
    .await
    .unwrap();
    let selector = ChannelSelector::new(Arc::new(pool));

    let err = selector.select(None).await.unwrap_err();
    assert!(matches!(err, PoolError::NoHealthyChannel));
}
