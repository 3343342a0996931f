use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, Timestamp, UserId};

/// 已读回执：记录某个用户已经看过某条消息。只增不删，重复写入幂等。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub read_at: Timestamp,
}

impl ReadReceipt {
    pub fn new(message_id: MessageId, user_id: UserId, read_at: Timestamp) -> Self {
        Self {
            message_id,
            user_id,
            read_at,
        }
    }
}
