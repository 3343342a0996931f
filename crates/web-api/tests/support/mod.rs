//! 集成测试支撑
//!
//! 在内存网关上拉起完整的 axum 服务，测试不依赖外部数据库。

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use application::memory::{
    MemoryCallSessionRepository, MemoryChatRoomRepository, MemoryMessageRepository,
    MemoryPresenceRepository, MemoryReadReceiptRepository, MemoryTypingRepository, MemoryUserStore,
};
use application::{
    CallService, CallServiceDependencies, ChatService, ChatServiceDependencies, Clock,
    ConnectionRegistry, PresenceRegistry, RoomService, RoomServiceDependencies, SystemClock,
    TypingTracker,
};
use domain::{User, UserId, UserRole};
use futures_util::{SinkExt, StreamExt};
use infrastructure::{JwtConfig, JwtIdentityResolver};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;
use web_api::{router, AppState};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct TestApp {
    pub addr: SocketAddr,
    pub users: Arc<MemoryUserStore>,
    resolver: Arc<JwtIdentityResolver>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApp {
    /// 在随机端口上拉起完整服务
    pub async fn spawn() -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let registry = Arc::new(ConnectionRegistry::new());
        let presence = Arc::new(PresenceRegistry::new(
            Arc::new(MemoryPresenceRepository::new()),
            registry.clone(),
            clock.clone(),
        ));

        let messages = Arc::new(MemoryMessageRepository::new());
        let rooms = Arc::new(RoomService::new(RoomServiceDependencies {
            rooms: Arc::new(MemoryChatRoomRepository::new()),
            users: users.clone(),
            messages: messages.clone(),
            clock: clock.clone(),
        }));
        let chat = Arc::new(ChatService::new(ChatServiceDependencies {
            rooms: rooms.clone(),
            users: users.clone(),
            messages,
            receipts: Arc::new(MemoryReadReceiptRepository::new()),
            registry: registry.clone(),
            clock: clock.clone(),
        }));
        let typing = Arc::new(TypingTracker::new(
            Arc::new(MemoryTypingRepository::new()),
            registry.clone(),
        ));
        let calls = Arc::new(CallService::new(CallServiceDependencies {
            rooms: rooms.clone(),
            calls: Arc::new(MemoryCallSessionRepository::new()),
            registry: registry.clone(),
            clock,
        }));

        let resolver = Arc::new(JwtIdentityResolver::new(
            JwtConfig {
                secret: "integration-test-secret-key-32-chars!".to_string(),
                expiration_hours: 24,
            },
            users.clone(),
        ));

        let state = AppState::new(
            resolver.clone(),
            rooms,
            chat,
            typing,
            calls,
            presence,
            registry,
        );

        let app = router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            users,
            resolver,
            shutdown: Some(shutdown_tx),
        }
    }

    /// 写入一个用户并签出其凭证
    pub async fn seed_user(&self, name: &str, role: UserRole) -> (UserId, String) {
        let user = User::new(UserId::from(Uuid::new_v4()), name, role, None);
        let user_id = user.id;
        self.users.insert(user).await;
        let token = self.resolver.issue_token(user_id).expect("issue token");
        (user_id, token)
    }

    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/api/v1/ws", self.addr)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// 建立一条未认证的 WebSocket 连接
pub async fn connect_ws(app: &TestApp) -> WsStream {
    let (ws, _) = connect_async(app.ws_url()).await.expect("ws connect");
    ws
}

/// 发送一个客户端事件帧
pub async fn send_event(ws: &mut WsStream, frame: serde_json::Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// 读取下一个文本帧并解析
pub async fn recv_event(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let message = timeout(EVENT_TIMEOUT, ws.next())
            .await
            .expect("等待事件超时")
            .expect("connection closed")
            .expect("ws error");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("invalid frame json");
        }
    }
}

/// 持续读取直到出现指定名称的事件（其余事件跳过）
pub async fn recv_until(ws: &mut WsStream, event: &str) -> serde_json::Value {
    loop {
        let frame = recv_event(ws).await;
        if frame["event"] == event {
            return frame;
        }
    }
}

/// 断言在给定时间窗口内不会出现指定事件
pub async fn assert_no_event(ws: &mut WsStream, event: &str, window: Duration) {
    let result = timeout(window, async {
        loop {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let frame: serde_json::Value =
                    serde_json::from_str(text.as_str()).expect("invalid frame json");
                if frame["event"] == event {
                    return frame;
                }
            }
        }
    })
    .await;

    if let Ok(frame) = result {
        panic!("不该出现的事件到达了: {frame}");
    }
}

/// 认证并等待 authenticated 回执
pub async fn authenticate(ws: &mut WsStream, token: &str) -> serde_json::Value {
    send_event(
        ws,
        serde_json::json!({"event": "authenticate", "data": {"token": token}}),
    )
    .await;
    recv_until(ws, "authenticated").await
}
