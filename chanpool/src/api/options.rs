//! オプションAPI（ルートのみ）

use crate::api::error::AppError;
use crate::common::envelope::ApiEnvelope;
use crate::common::error::PoolError;
use crate::db::options::{is_public_key, CHANNEL_DISABLE_THRESHOLD};
use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// オプション1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// キー
    pub key: String,
    /// 値
    pub value: String,
}

/// GET /api/option/ - オプション一覧（秘匿キーは除外）
pub async fn list_options(
    State(state): State<AppState>,
) -> Result<Json<ApiEnvelope<Vec<OptionEntry>>>, AppError> {
    let entries = state
        .options
        .list_options()
        .await?
        .into_iter()
        .filter(|(key, _)| is_public_key(key))
        .map(|(key, value)| OptionEntry { key, value })
        .collect();
    Ok(Json(ApiEnvelope::ok(entries)))
}

fn validate(entry: &OptionEntry) -> Result<(), PoolError> {
    if entry.key.trim().is_empty() {
        return Err(PoolError::Validation("Option key is required".to_string()));
    }
    if entry.key == CHANNEL_DISABLE_THRESHOLD {
        match entry.value.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => {}
            _ => {
                return Err(PoolError::Validation(format!(
                    "{} must be a non-negative number of seconds",
                    CHANNEL_DISABLE_THRESHOLD
                )))
            }
        }
    }
    Ok(())
}

/// PUT /api/option/ - オプション更新
pub async fn update_option(
    State(state): State<AppState>,
    Json(entry): Json<OptionEntry>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    validate(&entry)?;
    state
        .options
        .set_option(&entry.key, entry.value.trim())
        .await?;
    tracing::info!(key = %entry.key, "Option updated");
    Ok(Json(ApiEnvelope::ok_empty()))
}
