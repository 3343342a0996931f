//! 聊天室实体定义
//!
//! 聊天室是一名学生和一名导师之间的双人会话容器，
//! 同一 (学生, 导师) 组合最多存在一个聊天室。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::user::User;
use crate::value_objects::{RoomId, Timestamp, UserId};

/// 聊天室实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    /// 聊天室唯一ID
    pub id: RoomId,
    /// 学生侧参与者
    pub student_id: UserId,
    /// 导师侧参与者
    pub advisor_id: UserId,
    /// 最近一次活动时间（发消息时刷新）
    pub last_activity_at: Timestamp,
    /// 创建时间
    pub created_at: Timestamp,
}

impl ChatRoom {
    /// 创建新的聊天室。
    ///
    /// 参与者必须恰好是一名学生和一名导师；两侧不能是同一个用户。
    pub fn new(id: RoomId, student: &User, advisor: &User, now: Timestamp) -> DomainResult<Self> {
        if student.id == advisor.id {
            return Err(DomainError::invalid_argument(
                "participants",
                "两侧不能是同一个用户",
            ));
        }
        if !student.is_student() || !advisor.is_advisor() {
            return Err(DomainError::InvalidParticipants);
        }

        Ok(Self {
            id,
            student_id: student.id,
            advisor_id: advisor.id,
            last_activity_at: now,
            created_at: now,
        })
    }

    /// 从数据库行恢复（不重新校验角色，历史数据以存储为准）。
    pub fn from_parts(
        id: RoomId,
        student_id: UserId,
        advisor_id: UserId,
        last_activity_at: Timestamp,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            student_id,
            advisor_id,
            last_activity_at,
            created_at,
        }
    }

    /// 检查用户是否是该聊天室的参与者
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.student_id == user_id || self.advisor_id == user_id
    }

    /// 计算房间内的另一位参与者。
    ///
    /// 消息的接收者永远由服务端计算，不信任客户端提交的值。
    pub fn other_participant(&self, user_id: UserId) -> DomainResult<UserId> {
        if self.student_id == user_id {
            Ok(self.advisor_id)
        } else if self.advisor_id == user_id {
            Ok(self.student_id)
        } else {
            Err(DomainError::NotRoomParticipant)
        }
    }

    /// 刷新最近活动时间
    pub fn touch(&mut self, now: Timestamp) {
        self.last_activity_at = now;
    }
}
