//! チャネル管理API
//!
//! 一覧・検索・単一取得・登録・更新・削除と、単一/全体のチャネルテスト。

use crate::api::error::AppError;
use crate::common::envelope::ApiEnvelope;
use crate::common::error::PoolError;
use crate::health::probe::ProbeRequest;
use crate::types::channel::{Channel, ChannelUpdate, RESPONSE_TIME_UNMEASURED};
use crate::types::user::{Caller, Role};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 一覧の1ページあたりの件数
pub const CHANNELS_PAGE_SIZE: i64 = 10;

/// 一覧クエリ
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// ページ番号（0始まり）
    #[serde(default)]
    pub p: Option<i64>,
}

/// 検索クエリ
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// IDまたは名前の前方一致
    #[serde(default)]
    pub keyword: String,
}

/// 単一取得クエリ
#[derive(Debug, Default, Deserialize)]
pub struct GetQuery {
    /// 認証情報を含めるか（ルートのみ有効）
    #[serde(default)]
    pub with_key: bool,
}

/// テストクエリ
#[derive(Debug, Default, Deserialize)]
pub struct TestQuery {
    /// プローブに使うモデル名
    #[serde(default)]
    pub model: Option<String>,
}

/// 単一チャネルテストのレスポンス
#[derive(Debug, Serialize)]
pub struct ChannelTestResponse {
    /// 成功したか
    pub success: bool,
    /// 失敗理由
    pub message: String,
    /// 経過秒数
    pub time: f64,
}

/// GET /api/channel/?p= - チャネル一覧（認証情報なし）
pub async fn list_channels(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiEnvelope<Vec<Channel>>>, AppError> {
    let page = query.p.unwrap_or(0).max(0);
    let channels = state
        .store
        .list_channels(page * CHANNELS_PAGE_SIZE, CHANNELS_PAGE_SIZE)
        .await?;
    Ok(Json(ApiEnvelope::ok(channels)))
}

/// GET /api/channel/search?keyword= - チャネル検索（認証情報なし）
pub async fn search_channels(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiEnvelope<Vec<Channel>>>, AppError> {
    let channels = state.store.search_channels(query.keyword.trim()).await?;
    Ok(Json(ApiEnvelope::ok(channels)))
}

/// GET /api/channel/{id}?with_key= - チャネル取得
///
/// 認証情報はルートが `with_key=true` を指定したときだけ含める。
pub async fn get_channel(
    Extension(caller): Extension<Caller>,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<GetQuery>,
) -> Result<Json<ApiEnvelope<Channel>>, AppError> {
    let with_credential = query.with_key && caller.role >= Role::Root;
    let channel = state.store.get_channel(id, with_credential).await?;
    Ok(Json(ApiEnvelope::ok(channel)))
}

/// 登録用にサーバー側で管理する値を初期化する
fn prepare_for_insert(mut channel: Channel, credential: &str) -> Channel {
    channel.id = 0;
    channel.credential = Some(credential.to_string());
    channel.created_at = chrono::Utc::now().timestamp();
    channel.last_tested_at = 0;
    channel.response_time_ms = RESPONSE_TIME_UNMEASURED;
    channel.balance = None;
    channel.balance_updated_at = None;
    channel
}

/// POST /api/channel/ - チャネル登録
///
/// 認証情報が複数行の場合は1行につき1チャネルを一括登録する。
pub async fn create_channel(
    State(state): State<AppState>,
    Json(channel): Json<Channel>,
) -> Result<Json<ApiEnvelope<Vec<i64>>>, AppError> {
    let credentials: Vec<String> = channel
        .credential
        .as_deref()
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if credentials.is_empty() {
        return Err(PoolError::Validation("Channel key is required".to_string()).into());
    }

    let channels: Vec<Channel> = credentials
        .iter()
        .map(|credential| prepare_for_insert(channel.clone(), credential))
        .collect();

    let ids = if channels.len() == 1 {
        vec![state.store.create_channel(&channels[0]).await?]
    } else {
        state.store.create_channels(&channels).await?
    };

    info!(count = ids.len(), kind = %channel.kind, "Channels created");
    Ok(Json(ApiEnvelope::ok(ids)))
}

/// PUT /api/channel/ - チャネル更新
///
/// 送られたフィールドだけを書き換える。認証情報が空なら既存の値を残す。
pub async fn update_channel(
    State(state): State<AppState>,
    Json(update): Json<ChannelUpdate>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    if update.id <= 0 {
        return Err(PoolError::Validation("Channel id is required".to_string()).into());
    }
    state.store.update_channel(&update).await?;
    info!(channel_id = update.id, "Channel updated");
    Ok(Json(ApiEnvelope::ok_empty()))
}

/// DELETE /api/channel/{id} - チャネル削除
pub async fn delete_channel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    state.store.delete_channel(id).await?;
    info!(channel_id = id, "Channel deleted");
    Ok(Json(ApiEnvelope::ok_empty()))
}

/// GET /api/channel/test/{id}?model= - 単一チャネルテスト
pub async fn test_channel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<TestQuery>,
) -> Result<Json<ChannelTestResponse>, AppError> {
    let report = state.sweep.test_channel(id, query.model.as_deref()).await?;
    Ok(Json(ChannelTestResponse {
        success: report.success,
        message: report.message,
        time: report.elapsed_seconds,
    }))
}

/// GET /api/channel/test?model= - 全チャネルテストを開始
///
/// 受理したら完了を待たずに返す。実行中なら `AlreadyRunning`。
pub async fn test_all_channels(
    State(state): State<AppState>,
    Query(query): Query<TestQuery>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    state
        .sweep
        .run_sweep(ProbeRequest::new(query.model.as_deref()))
        .await?;
    Ok(Json(ApiEnvelope::ok_empty()))
}
