//! Web API 层
//!
//! axum 路由：REST 接口 + WebSocket 升级入口。

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;
pub mod ws_connection;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ApiError;
pub use state::AppState;

/// 组装完整的应用路由
pub fn router(state: AppState) -> Router {
    let api = routes::api_router().route("/ws", get(websocket::ws_handler));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
