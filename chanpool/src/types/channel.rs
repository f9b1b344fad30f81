//! チャネル型定義
//!
//! チャネル = 上流プロバイダ（種別・ベースURL・認証情報）の設定1件

use crate::common::error::PoolError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// レイテンシ未計測を表す値
pub const RESPONSE_TIME_UNMEASURED: i64 = -1;

/// チャネル種別（プロバイダ）
///
/// リクエストURLの組み立て方と認証ヘッダーの形式を決める。
/// 数値コードは既存データとの互換のために保持している。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// OpenAI公式
    #[default]
    OpenAi,
    /// API2D
    Api2d,
    /// Azure OpenAI
    Azure,
    /// CloseAI
    CloseAi,
    /// OpenAI-SB
    OpenAiSb,
    /// OpenAI Max
    OpenAiMax,
    /// OhMyGPT
    OhMyGpt,
    /// 任意のベースURLを持つOpenAI互換API
    Custom,
}

impl ChannelKind {
    /// すべての種別
    pub const ALL: [ChannelKind; 8] = [
        Self::OpenAi,
        Self::Api2d,
        Self::Azure,
        Self::CloseAi,
        Self::OpenAiSb,
        Self::OpenAiMax,
        Self::OhMyGpt,
        Self::Custom,
    ];

    /// ChannelKindを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "open_ai",
            Self::Api2d => "api2d",
            Self::Azure => "azure",
            Self::CloseAi => "close_ai",
            Self::OpenAiSb => "open_ai_sb",
            Self::OpenAiMax => "open_ai_max",
            Self::OhMyGpt => "oh_my_gpt",
            Self::Custom => "custom",
        }
    }

    /// 互換用の数値コード
    pub fn code(&self) -> u8 {
        match self {
            Self::OpenAi => 1,
            Self::Api2d => 2,
            Self::Azure => 3,
            Self::CloseAi => 4,
            Self::OpenAiSb => 5,
            Self::OpenAiMax => 6,
            Self::OhMyGpt => 7,
            Self::Custom => 8,
        }
    }

    /// 数値コードから種別を取得
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// プロバイダの既定ベースURL
    ///
    /// AzureとCustomは利用者ごとにURLが異なるため既定値を持たない。
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://api.openai.com"),
            Self::Api2d => Some("https://openai.api2d.net"),
            Self::Azure => None,
            Self::CloseAi => Some("https://api.openai-asia.com"),
            Self::OpenAiSb => Some("https://api.openai-sb.com"),
            Self::OpenAiMax => Some("https://api.openaimax.com"),
            Self::OhMyGpt => Some("https://api.ohmygpt.com"),
            Self::Custom => None,
        }
    }

    /// プローブ時に使う既定モデル名
    ///
    /// Azureのデプロイ名にはドットを含められないため別名を使う。
    pub fn default_probe_model(&self) -> &'static str {
        match self {
            Self::Azure => "gpt-35-turbo",
            _ => "gpt-3.5-turbo",
        }
    }
}

/// ChannelKind のパースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChannelKindError(pub String);

impl std::fmt::Display for ParseChannelKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown channel kind: '{}'", self.0)
    }
}

impl std::error::Error for ParseChannelKindError {}

impl FromStr for ChannelKind {
    type Err = ParseChannelKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| ParseChannelKindError(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseChannelKindError(s.to_string()))
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// チャネルの状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// 選択対象
    #[default]
    Enabled,
    /// ローテーションから除外
    Disabled,
}

impl ChannelStatus {
    /// ChannelStatusを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for ChannelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" | "1" => Ok(Self::Enabled),
            "disabled" | "2" => Ok(Self::Disabled),
            other => Err(format!("unknown channel status: '{}'", other)),
        }
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// チャネル
///
/// `credential` は一覧・検索では常に `None`。
/// 認証情報込みの単一取得でのみ値が入る。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    /// ストアが採番するID
    #[serde(default)]
    pub id: i64,
    /// プロバイダ種別
    #[serde(default)]
    pub kind: ChannelKind,
    /// 認証情報（APIキー）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// 状態
    #[serde(default)]
    pub status: ChannelStatus,
    /// 表示名（一意ではない）
    #[serde(default)]
    pub name: String,
    /// 将来の重み付き選択用（現状の選択では無視）
    #[serde(default)]
    pub weight: i64,
    /// ベースURL（空なら種別の既定値）
    #[serde(default)]
    pub base_url: String,
    /// 種別ごとの補足情報（Azureのapi-versionなど）
    #[serde(default)]
    pub other: String,
    /// 作成日時（UNIX秒）
    #[serde(default)]
    pub created_at: i64,
    /// 最終プローブ日時（UNIX秒、0は未テスト）
    #[serde(default)]
    pub last_tested_at: i64,
    /// 直近のレイテンシ（ミリ秒、-1は未計測）
    #[serde(default = "unmeasured")]
    pub response_time_ms: i64,
    /// 残高スナップショット（USD）
    #[serde(default)]
    pub balance: Option<f64>,
    /// 残高更新日時（UNIX秒）
    #[serde(default)]
    pub balance_updated_at: Option<i64>,
}

fn unmeasured() -> i64 {
    RESPONSE_TIME_UNMEASURED
}

impl Channel {
    /// 新しいチャネルを作成（IDはストア登録時に採番）
    pub fn new(kind: ChannelKind, name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind,
            credential: Some(credential.into()),
            status: ChannelStatus::Enabled,
            name: name.into(),
            weight: 0,
            base_url: String::new(),
            other: String::new(),
            created_at: chrono::Utc::now().timestamp(),
            last_tested_at: 0,
            response_time_ms: RESPONSE_TIME_UNMEASURED,
            balance: None,
            balance_updated_at: None,
        }
    }

    /// ベースURLを設定
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 状態を設定
    pub fn with_status(mut self, status: ChannelStatus) -> Self {
        self.status = status;
        self
    }

    /// 選択対象かどうか
    pub fn is_enabled(&self) -> bool {
        self.status == ChannelStatus::Enabled
    }
}

/// 管理操作による部分更新
///
/// 値のあるフィールドだけを書き換える。`credential` は空文字も未指定として扱う。
/// プローブ結果と残高はここからは変更できない。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelUpdate {
    /// 対象のID
    #[serde(default)]
    pub id: i64,
    /// プロバイダ種別
    pub kind: Option<ChannelKind>,
    /// 認証情報
    pub credential: Option<String>,
    /// 状態
    pub status: Option<ChannelStatus>,
    /// 表示名
    pub name: Option<String>,
    /// 重み
    pub weight: Option<i64>,
    /// ベースURL
    pub base_url: Option<String>,
    /// 種別ごとの補足情報
    pub other: Option<String>,
}

impl ChannelUpdate {
    /// IDだけを持つ空の更新
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// 書き込む認証情報（空文字は据え置き）
    pub fn effective_credential(&self) -> Option<&str> {
        self.credential.as_deref().filter(|key| !key.is_empty())
    }
}

/// プローブ失敗の内訳
///
/// 方針判定ではどちらも「このチャネルは失敗」として扱うが、
/// 通知文面には区別が残る。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// ネットワーク・タイムアウト・デコード失敗
    #[error("{0}")]
    Transport(String),

    /// HTTP成功だがボディにエラーオブジェクトがあった
    #[error("type {error_type}, code {code}, message {message}")]
    Provider {
        /// プロバイダのエラー種別
        error_type: String,
        /// プロバイダのエラーコード
        code: String,
        /// プロバイダのエラーメッセージ
        message: String,
    },
}

impl From<ProbeError> for PoolError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Transport(message) => PoolError::Transport(message),
            provider @ ProbeError::Provider { .. } => {
                PoolError::ProviderLogical(provider.to_string())
            }
        }
    }
}

/// 1チャネル1回分のプローブ結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// 成功したか
    pub success: bool,
    /// 送信直前からボディ読了までの経過時間（ミリ秒）
    ///
    /// 送信前に失敗した場合は `RESPONSE_TIME_UNMEASURED`。
    pub latency_ms: i64,
    /// 失敗理由
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    /// 成功結果
    pub fn succeeded(latency_ms: i64) -> Self {
        Self {
            success: true,
            latency_ms,
            error: None,
        }
    }

    /// 失敗結果
    pub fn failed(latency_ms: i64, error: ProbeError) -> Self {
        Self {
            success: false,
            latency_ms,
            error: Some(error),
        }
    }

    /// 経過秒数（表示用）
    pub fn elapsed_seconds(&self) -> f64 {
        self.latency_ms.max(0) as f64 / 1000.0
    }

    /// 失敗理由のテキスト（成功時は空文字）
    pub fn error_text(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }
}
