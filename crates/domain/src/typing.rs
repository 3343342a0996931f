use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, UserId};

/// 输入状态指示，按 (房间, 用户) 维度记录。
/// 完全是瞬态数据：开始输入时 upsert，停止输入或断开连接时删除，
/// 不属于消息历史。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub is_typing: bool,
}

impl TypingIndicator {
    pub fn typing(room_id: RoomId, user_id: UserId) -> Self {
        Self {
            room_id,
            user_id,
            is_typing: true,
        }
    }
}
