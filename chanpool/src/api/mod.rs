//! REST APIハンドラー
//!
//! 管理API（チャネル・オプション）、リレー経路、ヘルスチェックのルーティング。

/// チャネル管理API
pub mod channels;

/// APIエラーレスポンス型
pub mod error;

/// オプションAPI
pub mod options;

/// リレー経路
pub mod relay;

use crate::auth::middleware::{
    admin_auth_middleware, relay_auth_middleware, root_auth_middleware,
};
use crate::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// アプリケーションのルーターを構築する
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/channel/",
            get(channels::list_channels)
                .post(channels::create_channel)
                .put(channels::update_channel),
        )
        .route("/api/channel/search", get(channels::search_channels))
        .route("/api/channel/test", get(channels::test_all_channels))
        .route("/api/channel/test/{id}", get(channels::test_channel))
        .route(
            "/api/channel/{id}",
            get(channels::get_channel).delete(channels::delete_channel),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    let root_routes = Router::new()
        .route(
            "/api/option/",
            get(options::list_options).put(options::update_option),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            root_auth_middleware,
        ));

    let relay_routes = Router::new()
        .route("/v1/chat/completions", post(relay::chat_completions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            relay_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(admin_routes)
        .merge(root_routes)
        .merge(relay_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
