//! WebSocket 升级入口
//!
//! 升级本身不做认证：连接建立后的第一个事件应当是 authenticate，
//! 其余事件在认证完成前一律拒绝。

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::state::AppState;
use crate::ws_connection::WsConnection;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        WsConnection::new(state).run(socket).await;
    })
}
