//! チャネルデータベース操作
//!
//! 一覧・検索系は認証情報を読み出さない（`NULL AS credential`）。
//! 更新系はそれぞれが所有する列だけを書き換える。

use crate::types::channel::{Channel, ChannelStatus, ChannelUpdate};
use sqlx::SqlitePool;

/// 認証情報を含む列リスト
const COLUMNS_WITH_KEY: &str = "id, kind, credential, status, name, weight, base_url, other, \
     created_at, last_tested_at, response_time_ms, balance, balance_updated_at";

/// 認証情報を除いた列リスト
const COLUMNS_WITHOUT_KEY: &str = "id, kind, NULL AS credential, status, name, weight, base_url, \
     other, created_at, last_tested_at, response_time_ms, balance, balance_updated_at";

fn columns(with_credential: bool) -> &'static str {
    if with_credential {
        COLUMNS_WITH_KEY
    } else {
        COLUMNS_WITHOUT_KEY
    }
}

/// チャネルを登録し、採番されたIDを返す
pub async fn create_channel(pool: &SqlitePool, channel: &Channel) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO channels (
            kind, credential, status, name, weight, base_url, other,
            created_at, last_tested_at, response_time_ms, balance, balance_updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(channel.kind.as_str())
    .bind(channel.credential.as_deref().unwrap_or_default())
    .bind(channel.status.as_str())
    .bind(&channel.name)
    .bind(channel.weight)
    .bind(&channel.base_url)
    .bind(&channel.other)
    .bind(channel.created_at)
    .bind(channel.last_tested_at)
    .bind(channel.response_time_ms)
    .bind(channel.balance)
    .bind(channel.balance_updated_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// 複数チャネルを1トランザクションで登録
pub async fn create_channels(
    pool: &SqlitePool,
    channels: &[Channel],
) -> Result<Vec<i64>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(channels.len());

    for channel in channels {
        let result = sqlx::query(
            r#"
            INSERT INTO channels (
                kind, credential, status, name, weight, base_url, other,
                created_at, last_tested_at, response_time_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(channel.kind.as_str())
        .bind(channel.credential.as_deref().unwrap_or_default())
        .bind(channel.status.as_str())
        .bind(&channel.name)
        .bind(channel.weight)
        .bind(&channel.base_url)
        .bind(&channel.other)
        .bind(channel.created_at)
        .bind(channel.last_tested_at)
        .bind(channel.response_time_ms)
        .execute(&mut *tx)
        .await?;
        ids.push(result.last_insert_rowid());
    }

    tx.commit().await?;
    Ok(ids)
}

/// ページ単位でチャネル一覧を取得（認証情報なし、ID降順）
pub async fn list_channels(
    pool: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Channel>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM channels ORDER BY id DESC LIMIT ? OFFSET ?",
        COLUMNS_WITHOUT_KEY
    );
    let rows = sqlx::query_as::<_, ChannelRow>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// 全チャネルを状態に関係なく取得（認証情報あり、ID降順）
///
/// スイープ用。無効チャネルのスキップは呼び出し側が行う。
pub async fn list_all_channels(pool: &SqlitePool) -> Result<Vec<Channel>, sqlx::Error> {
    let sql = format!("SELECT {} FROM channels ORDER BY id DESC", COLUMNS_WITH_KEY);
    let rows = sqlx::query_as::<_, ChannelRow>(&sql)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// IDの完全一致または名前の前方一致で検索（認証情報なし）
pub async fn search_channels(
    pool: &SqlitePool,
    keyword: &str,
) -> Result<Vec<Channel>, sqlx::Error> {
    let id: Option<i64> = keyword.trim().parse().ok();
    let pattern = format!("{}%", escape_like(keyword));
    let sql = format!(
        "SELECT {} FROM channels WHERE id = ? OR name LIKE ? ESCAPE '\\' ORDER BY id DESC",
        COLUMNS_WITHOUT_KEY
    );
    let rows = sqlx::query_as::<_, ChannelRow>(&sql)
        .bind(id)
        .bind(pattern)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// IDでチャネルを取得
pub async fn get_channel(
    pool: &SqlitePool,
    id: i64,
    with_credential: bool,
) -> Result<Option<Channel>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM channels WHERE id = ?",
        columns(with_credential)
    );
    let row = sqlx::query_as::<_, ChannelRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.into()))
}

/// 有効チャネルから一様ランダムに1件取得（認証情報あり）
///
/// `weight` は現状考慮しない。
pub async fn pick_random_enabled(pool: &SqlitePool) -> Result<Option<Channel>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM channels WHERE status = ? ORDER BY RANDOM() LIMIT 1",
        COLUMNS_WITH_KEY
    );
    let row = sqlx::query_as::<_, ChannelRow>(&sql)
        .bind(ChannelStatus::Enabled.as_str())
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.into()))
}

/// 管理操作でチャネルを更新
///
/// 指定された列だけを書き換える。プローブ結果と残高の列には触れない。
pub async fn update_channel(
    pool: &SqlitePool,
    update: &ChannelUpdate,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE channels SET
            kind = COALESCE(?, kind),
            credential = COALESCE(?, credential),
            status = COALESCE(?, status),
            name = COALESCE(?, name),
            weight = COALESCE(?, weight),
            base_url = COALESCE(?, base_url),
            other = COALESCE(?, other)
        WHERE id = ?
        "#,
    )
    .bind(update.kind.map(|kind| kind.as_str()))
    .bind(update.effective_credential())
    .bind(update.status.map(|status| status.as_str()))
    .bind(update.name.as_deref())
    .bind(update.weight)
    .bind(update.base_url.as_deref())
    .bind(update.other.as_deref())
    .bind(update.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// プローブ結果（レイテンシと計測時刻）のみ更新
pub async fn update_probe_result(
    pool: &SqlitePool,
    id: i64,
    latency_ms: i64,
    tested_at: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE channels SET
            response_time_ms = ?,
            last_tested_at = ?
        WHERE id = ?
        "#,
    )
    .bind(latency_ms)
    .bind(tested_at)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// ステータスのみ更新
pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    status: ChannelStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE channels SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 残高スナップショットのみ更新
pub async fn update_balance(
    pool: &SqlitePool,
    id: i64,
    balance: f64,
    updated_at: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE channels SET
            balance = ?,
            balance_updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(balance)
    .bind(updated_at)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// チャネルを削除（論理削除なし）
pub async fn delete_channel(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM channels WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct ChannelRow {
    id: i64,
    kind: String,
    credential: Option<String>,
    status: String,
    name: String,
    weight: i64,
    base_url: String,
    other: String,
    created_at: i64,
    last_tested_at: i64,
    response_time_ms: i64,
    balance: Option<f64>,
    balance_updated_at: Option<i64>,
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Channel {
            id: row.id,
            kind: row.kind.parse().unwrap_or_default(),
            credential: row.credential,
            // 不明な値は安全側（選択対象外）に倒す
            status: row.status.parse().unwrap_or(ChannelStatus::Disabled),
            name: row.name,
            weight: row.weight,
            base_url: row.base_url,
            other: row.other,
            created_at: row.created_at,
            last_tested_at: row.last_tested_at,
            response_time_ms: row.response_time_ms,
            balance: row.balance,
            balance_updated_at: row.balance_updated_at,
        }
    }
}
