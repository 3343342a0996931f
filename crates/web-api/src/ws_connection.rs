//! WebSocket 连接管理器
//!
//! 封装单个长连接的完整生命周期：认证前后的状态、入站事件分发、
//! 出站事件写入、断开清理。
//!
//! 并发模型：每个连接一个任务，入站事件在这个任务里串行处理
//! （一个事件 await 完网关才轮到下一个），同一发送者对同一房间的
//! 消息顺序由此自然成立。出站写入解耦到单独的发送任务，广播
//! fire-and-forget，不阻塞触发方。事件处理中途断开时，进行中的
//! 网关调用不会被取消——结果投给已消失的连接，静默丢弃。

use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{CallId, ClientEvent, ConnectionId, MessageId, RoomId, ServerEvent, User, UserView};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use application::{ApplicationError, EventSender, SendMessageRequest};

use crate::state::AppState;

/// 认证完成后的连接会话状态
struct Session {
    user: User,
    /// 本连接在在线表里的代数，下线时凭它识别过期断开
    generation: u64,
    /// 客户端当前聚焦的房间（UI 状态，不是能力授予）
    focused_room: Option<RoomId>,
}

pub struct WsConnection {
    state: AppState,
    connection_id: ConnectionId,
}

impl WsConnection {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            connection_id: ConnectionId::generate(),
        }
    }

    /// 运行连接主循环直到断开
    pub async fn run(self, socket: WebSocket) {
        let (mut sender, mut incoming) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

        tracing::info!(connection_id = %self.connection_id, "WebSocket 连接已建立");

        // 发送任务：统一消化所有出站事件
        let send_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "序列化出站事件失败");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        });

        // 接收循环：入站事件串行处理
        let mut session: Option<Session> = None;
        while let Some(Ok(message)) = incoming.next().await {
            match message {
                WsMessage::Text(text) => {
                    self.handle_frame(&tx, &mut session, text.as_str()).await;
                }
                WsMessage::Close(_) => break,
                // Ping/Pong 由底层协议栈应答
                _ => {}
            }
        }

        // 断开清理：注销连接，认证过的还要清输入指示、登记下线
        self.state.registry.unregister(self.connection_id).await;
        if let Some(session) = session {
            self.state.typing.clear_for_user(session.user.id).await;
            self.state
                .presence
                .register_offline(session.user.id, session.generation)
                .await;
            tracing::info!(
                connection_id = %self.connection_id,
                user_id = %session.user.id,
                "WebSocket 连接已断开，在线状态已清理"
            );
        } else {
            tracing::info!(connection_id = %self.connection_id, "未认证连接断开");
        }

        send_task.abort();
    }

    /// 处理单个入站帧。任何错误都转成发给本连接的 error 事件，
    /// 绝不终止连接、更不会波及进程。
    async fn handle_frame(&self, tx: &EventSender, session: &mut Option<Session>, text: &str) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(error = %err, "入站帧解析失败");
                let _ = tx.send(ServerEvent::error("VALIDATION_FAILED", "malformed event"));
                return;
            }
        };

        if let ClientEvent::Authenticate { token } = &event {
            self.authenticate(tx, session, token).await;
            return;
        }

        let Some(session) = session.as_mut() else {
            let _ = tx.send(ServerEvent::error("AUTH_REQUIRED", "authenticate first"));
            return;
        };

        if let Err(err) = self.dispatch(tx, session, event).await {
            let _ = tx.send(ServerEvent::error(err.code(), err.to_string()));
        }
    }

    /// 认证事件：解析凭证、登记连接、订阅房间、登记上线。
    /// 失败时连接保持未认证，等下一次 authenticate。
    async fn authenticate(&self, tx: &EventSender, session: &mut Option<Session>, token: &str) {
        let user = match self.state.identity.resolve(token).await {
            Ok(user) => user,
            Err(err) => {
                tracing::debug!(connection_id = %self.connection_id, error = %err, "认证失败");
                let _ = tx.send(ServerEvent::AuthError {
                    message: "invalid or expired credential".to_string(),
                });
                return;
            }
        };

        self.state
            .registry
            .register(self.connection_id, user.id, tx.clone())
            .await;

        // 订阅用户参与的全部房间的扇出
        match self.state.rooms.rooms_for(user.id).await {
            Ok(rooms) => {
                let room_ids: Vec<RoomId> = rooms.iter().map(|room| room.id).collect();
                self.state
                    .registry
                    .join_rooms(self.connection_id, &room_ids)
                    .await;
            }
            Err(err) => {
                // 订阅失败不算认证失败，后续 join_room 仍可补挂
                tracing::warn!(user_id = %user.id, error = %err, "解析房间订阅失败");
            }
        }

        let generation = self
            .state
            .presence
            .register_online(user.id, self.connection_id)
            .await;

        tracing::info!(
            connection_id = %self.connection_id,
            user_id = %user.id,
            "连接认证成功"
        );

        let view = UserView::from(&user);
        *session = Some(Session {
            user,
            generation,
            focused_room: None,
        });
        let _ = tx.send(ServerEvent::Authenticated { user: view });
    }

    async fn dispatch(
        &self,
        tx: &EventSender,
        session: &mut Session,
        event: ClientEvent,
    ) -> Result<(), ApplicationError> {
        let user_id = session.user.id;

        match event {
            // 已在 handle_frame 拦截
            ClientEvent::Authenticate { .. } => unreachable!("authenticate handled earlier"),

            ClientEvent::JoinRoom { chat_room_id } => {
                let room_id = RoomId::from(chat_room_id);
                let room = self.state.rooms.join_active(user_id, room_id).await?;
                self.state
                    .registry
                    .join_room(self.connection_id, room.id)
                    .await;
                session.focused_room = Some(room.id);
                let _ = tx.send(ServerEvent::RoomJoined {
                    chat_room_id: room.id.into(),
                });
            }

            ClientEvent::LeaveRoom { chat_room_id } => {
                // 只收窄 UI 焦点，不退订房间扇出
                if session.focused_room == Some(RoomId::from(chat_room_id)) {
                    session.focused_room = None;
                }
                let _ = tx.send(ServerEvent::RoomLeft { chat_room_id });
            }

            ClientEvent::SendMessage {
                chat_room_id,
                content,
                message_type,
                reply_to_message_id,
                metadata,
            } => {
                // 广播和发送确认都由分发器完成
                self.state
                    .chat
                    .send(SendMessageRequest {
                        room_id: RoomId::from(chat_room_id),
                        sender_id: user_id,
                        content,
                        message_type: message_type.unwrap_or_default(),
                        reply_to_id: reply_to_message_id.map(MessageId::from),
                        metadata,
                        origin: Some(self.connection_id),
                    })
                    .await?;
            }

            ClientEvent::TypingStart { chat_room_id } => {
                self.state
                    .typing
                    .start(RoomId::from(chat_room_id), user_id, self.connection_id)
                    .await;
            }

            ClientEvent::TypingStop { chat_room_id } => {
                self.state
                    .typing
                    .stop(RoomId::from(chat_room_id), user_id, self.connection_id)
                    .await;
            }

            ClientEvent::MarkAsRead {
                chat_room_id,
                message_ids,
            } => {
                let ids: Vec<MessageId> = message_ids.into_iter().map(MessageId::from).collect();
                self.state
                    .chat
                    .mark_many_read(RoomId::from(chat_room_id), &ids, user_id)
                    .await?;
            }

            ClientEvent::CallInitiate {
                chat_room_id,
                call_type,
                // 被叫方按房间另一位参与者计算，客户端提交的值无视
                receiver_id: _,
            } => {
                self.state
                    .calls
                    .initiate(RoomId::from(chat_room_id), user_id, call_type)
                    .await?;
            }

            ClientEvent::CallAccept { call_id } => {
                self.state
                    .calls
                    .accept(CallId::from(call_id), user_id)
                    .await?;
            }

            ClientEvent::CallReject { call_id } => {
                self.state.calls.reject(CallId::from(call_id)).await?;
            }

            ClientEvent::CallEnd { call_id } => {
                self.state
                    .calls
                    .end(CallId::from(call_id), user_id)
                    .await?;
            }
        }

        Ok(())
    }
}
