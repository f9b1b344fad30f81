//! 認証ミドルウェア
//!
//! 認証に成功すると `Caller` をリクエスト拡張に格納する。

use crate::api::error::{AppError, RelayError};
use crate::auth::{authorize_pin, parse_relay_key, require_role};
use crate::common::error::{PoolError, PoolResult};
use crate::types::user::{Caller, Role};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

fn authorization_header(headers: &HeaderMap) -> PoolResult<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PoolError::Authentication("Missing Authorization header".to_string()))
}

/// アクセストークンで管理APIの呼び出し元を特定する
async fn authenticate_access_token(
    state: &AppState,
    headers: &HeaderMap,
    min_role: Role,
) -> PoolResult<Caller> {
    let raw = authorization_header(headers)?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

    let user = state
        .users
        .find_by_access_token(token)
        .await?
        .ok_or_else(|| PoolError::Authentication("Invalid access token".to_string()))?;
    require_role(&user, min_role)?;

    Ok(Caller {
        user_id: user.id,
        role: user.role,
        pinned_channel: None,
    })
}

/// 管理者以上を要求する
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = authenticate_access_token(&state, request.headers(), Role::Admin).await?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// ルートを要求する
pub async fn root_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = authenticate_access_token(&state, request.headers(), Role::Root).await?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// リレー用トークンで認証する
///
/// `sk-<key>-<channelId>` のチャネル指定は管理者以上のみ許可する。
pub async fn relay_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    let relay_key = parse_relay_key(authorization_header(request.headers())?)?;

    let user = state
        .users
        .find_token_owner(&relay_key.key)
        .await?
        .ok_or_else(|| PoolError::Authentication("Invalid API key".to_string()))?;
    require_role(&user, Role::Common)?;
    let pinned_channel = authorize_pin(user.role, relay_key.pinned_channel)?;

    request.extensions_mut().insert(Caller {
        user_id: user.id,
        role: user.role,
        pinned_channel,
    });
    Ok(next.run(request).await)
}
