//! 型定義モジュール
//!
//! ドメインエンティティの型定義を提供

/// チャネル関連の型定義
pub mod channel;

/// ユーザー・トークン関連の型定義
pub mod user;

pub use channel::{Channel, ChannelKind, ChannelStatus, ProbeError, ProbeOutcome};
pub use user::{Caller, Role, User, UserStatus};
