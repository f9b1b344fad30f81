//! 認証モジュール
//!
//! 管理APIはアクセストークン（`Authorization: <token>`）、
//! リレー経路は `Authorization: Bearer sk-<key>[-<channelId>]` で認証する。

/// 認証ミドルウェア（管理API, リレー）
pub mod middleware;

/// 初回起動時のルートユーザー作成
pub mod bootstrap;

use crate::common::error::{PoolError, PoolResult};
use crate::types::user::{Role, User, UserStatus};

/// リレーキーのプレフィックス
pub const RELAY_KEY_PREFIX: &str = "sk-";

/// 解析済みのリレーキー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayKey {
    /// キー本体（`sk-` 以降、チャネル指定を除く）
    pub key: String,
    /// 指定されたチャネルID
    pub pinned_channel: Option<i64>,
}

/// `Authorization` ヘッダー値からリレーキーを取り出す
///
/// `Bearer ` と `sk-` はどちらも省略可。最初の `-` 以降はチャネルIDとして扱う。
pub fn parse_relay_key(header_value: &str) -> PoolResult<RelayKey> {
    let raw = header_value.trim();
    let raw = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    let raw = raw.strip_prefix(RELAY_KEY_PREFIX).unwrap_or(raw);

    let (key, pin) = match raw.split_once('-') {
        Some((key, pin)) => (key, Some(pin)),
        None => (raw, None),
    };

    if key.is_empty() {
        return Err(PoolError::Authentication("Missing API key".to_string()));
    }

    let pinned_channel = match pin {
        Some(pin) => Some(
            pin.parse::<i64>()
                .map_err(|_| PoolError::Validation(format!("Invalid channel id: '{}'", pin)))?,
        ),
        None => None,
    };

    Ok(RelayKey {
        key: key.to_string(),
        pinned_channel,
    })
}

/// チャネル指定の権限を確認（管理者以上のみ許可）
pub fn authorize_pin(role: Role, pinned: Option<i64>) -> PoolResult<Option<i64>> {
    match pinned {
        Some(_) if role < Role::Admin => Err(PoolError::Authorization(
            "Ordinary users cannot pin channels".to_string(),
        )),
        other => Ok(other),
    }
}

/// 有効なユーザーで、かつ最低ロールを満たすかを確認
pub fn require_role(user: &User, min_role: Role) -> PoolResult<()> {
    if user.status != UserStatus::Enabled {
        return Err(PoolError::Authorization("User has been disabled".to_string()));
    }
    if user.role < min_role {
        return Err(PoolError::Authorization(
            "Insufficient permissions".to_string(),
        ));
    }
    Ok(())
}
