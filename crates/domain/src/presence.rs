use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId};

/// 在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        }
    }
}

/// 用户在线状态记录，认证时写 online，断开时写 offline。
/// 持久化是尽力而为的，失败只记日志，不阻塞内存状态和广播。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub last_seen_at: Timestamp,
}

impl PresenceRecord {
    pub fn online(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Online,
            last_seen_at: now,
        }
    }

    pub fn offline(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Offline,
            last_seen_at: now,
        }
    }
}
