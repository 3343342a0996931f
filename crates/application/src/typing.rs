//! 输入状态追踪
//!
//! 房间维度的瞬态布尔状态：开始输入 upsert 一行并广播给房间里
//! 除发送者以外的连接，停止输入删除并广播 false。这里只要求连接
//! 已认证，不做房间成员校验（沿用既有的宽松行为，见 DESIGN.md）。
//!
//! 来不及发 typing_stop 就断线的连接由 `clear_for_user` 兜底：
//! 断开路径清掉该用户的全部指示并向受影响的房间广播 false。

use std::sync::Arc;

use domain::{ConnectionId, RoomId, ServerEvent, TypingIndicator, TypingRepository, UserId};

use crate::registry::ConnectionRegistry;

pub struct TypingTracker {
    store: Arc<dyn TypingRepository>,
    registry: Arc<ConnectionRegistry>,
}

impl TypingTracker {
    pub fn new(store: Arc<dyn TypingRepository>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { store, registry }
    }

    /// 开始输入。持久化是尽力而为，失败不拦住广播。
    pub async fn start(&self, room_id: RoomId, user_id: UserId, origin: ConnectionId) {
        if let Err(err) = self
            .store
            .upsert(TypingIndicator::typing(room_id, user_id))
            .await
        {
            tracing::warn!(error = %err, room_id = %room_id, user_id = %user_id, "写入输入状态失败");
        }

        self.registry
            .broadcast_room(
                room_id,
                ServerEvent::UserTyping {
                    chat_room_id: room_id.into(),
                    user_id: user_id.into(),
                    typing: true,
                },
                Some(origin),
            )
            .await;
    }

    /// 停止输入。
    pub async fn stop(&self, room_id: RoomId, user_id: UserId, origin: ConnectionId) {
        if let Err(err) = self.store.delete(room_id, user_id).await {
            tracing::warn!(error = %err, room_id = %room_id, user_id = %user_id, "删除输入状态失败");
        }

        self.registry
            .broadcast_room(
                room_id,
                ServerEvent::UserTyping {
                    chat_room_id: room_id.into(),
                    user_id: user_id.into(),
                    typing: false,
                },
                Some(origin),
            )
            .await;
    }

    /// 断开连接时清掉用户的全部输入指示，让对端收敛到 false。
    pub async fn clear_for_user(&self, user_id: UserId) {
        let rooms = match self.store.delete_for_user(user_id).await {
            Ok(rooms) => rooms,
            Err(err) => {
                tracing::warn!(error = %err, user_id = %user_id, "清理输入状态失败");
                return;
            }
        };

        for room_id in rooms {
            self.registry
                .broadcast_room(
                    room_id,
                    ServerEvent::UserTyping {
                        chat_room_id: room_id.into(),
                        user_id: user_id.into(),
                        typing: false,
                    },
                    None,
                )
                .await;
        }
    }
}
