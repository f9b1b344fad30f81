//! ユーザー・呼び出し元の型定義

use serde::{Deserialize, Serialize};

/// ユーザーロール
///
/// 数値が大きいほど権限が強い。比較で最低ロールを判定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 未登録
    Guest,
    /// 一般ユーザー
    #[default]
    Common,
    /// 管理者
    Admin,
    /// ルート（オペレーター）
    Root,
}

impl Role {
    /// 永続化用の数値
    pub fn code(&self) -> i64 {
        match self {
            Self::Guest => 0,
            Self::Common => 1,
            Self::Admin => 10,
            Self::Root => 100,
        }
    }

    /// 数値から変換（未知の値はGuest扱い）
    pub fn from_code(code: i64) -> Self {
        match code {
            100.. => Self::Root,
            10..=99 => Self::Admin,
            1..=9 => Self::Common,
            _ => Self::Guest,
        }
    }
}

/// ユーザーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// 有効
    #[default]
    Enabled,
    /// 無効（BAN）
    Disabled,
}

impl UserStatus {
    /// UserStatusを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }

    /// 文字列から変換（未知の値は無効扱い）
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "enabled" => Self::Enabled,
            _ => Self::Disabled,
        }
    }
}

/// ユーザー
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// ユーザーID
    pub id: i64,
    /// ユーザー名
    pub username: String,
    /// ロール
    pub role: Role,
    /// 状態
    pub status: UserStatus,
    /// 通知先メールアドレス
    pub email: String,
}

/// 認証済みの呼び出し元
///
/// 認証ミドルウェアがリクエスト拡張に格納する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// ユーザーID
    pub user_id: i64,
    /// ロール
    pub role: Role,
    /// 呼び出し元が指定したチャネルID（管理者のみ）
    pub pinned_channel: Option<i64>,
}
