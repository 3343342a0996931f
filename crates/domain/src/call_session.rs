//! 通话会话实体与状态机
//!
//! 一次通话在两位参与者之间经历 ringing → active → ended，
//! 或被拒绝时从 ringing 直接短路到 ended。ended 是终态，不可复活。
//!
//! 状态转换的业务规则在这里；并发下的强制执行依赖存储层的
//! 过滤更新（例如 accept 只在 status = ringing 且 participant 匹配时生效）。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{CallId, RoomId, Timestamp, UserId};

/// 通话类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Voice,
    Video,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Voice => "voice",
            CallType::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "voice" => Some(CallType::Voice),
            "video" => Some(CallType::Video),
            _ => None,
        }
    }
}

/// 通话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// 响铃中，等待被叫方应答
    Ringing,
    /// 通话进行中
    Active,
    /// 已结束（终态）
    Ended,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Active => "active",
            CallStatus::Ended => "ended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ringing" => Some(CallStatus::Ringing),
            "active" => Some(CallStatus::Active),
            "ended" => Some(CallStatus::Ended),
            _ => None,
        }
    }
}

/// 通话会话实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    /// 会话唯一ID
    pub id: CallId,
    /// 所属聊天室ID
    pub room_id: RoomId,
    /// 发起方
    pub initiator_id: UserId,
    /// 被叫方
    pub participant_id: UserId,
    /// 通话类型
    pub call_type: CallType,
    /// 当前状态
    pub status: CallStatus,
    /// 接通时间（accept 时写入）
    pub started_at: Option<Timestamp>,
    /// 结束时间
    pub ended_at: Option<Timestamp>,
    /// 通话时长（整秒，结束时派生）
    pub duration_seconds: Option<i64>,
    /// 创建（开始响铃）时间
    pub created_at: Timestamp,
}

impl CallSession {
    /// 发起通话，初始状态为 ringing。
    pub fn ring(
        id: CallId,
        room_id: RoomId,
        initiator_id: UserId,
        participant_id: UserId,
        call_type: CallType,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            initiator_id,
            participant_id,
            call_type,
            status: CallStatus::Ringing,
            started_at: None,
            ended_at: None,
            duration_seconds: None,
            created_at: now,
        }
    }

    /// 接听：ringing → active，只有被叫方可以接听。
    pub fn accept(&mut self, user_id: UserId, now: Timestamp) -> DomainResult<()> {
        if self.status != CallStatus::Ringing {
            return Err(DomainError::InvalidCallTransition { action: "accept" });
        }
        if user_id != self.participant_id {
            return Err(DomainError::InvalidCallTransition { action: "accept" });
        }

        self.status = CallStatus::Active;
        self.started_at = Some(now);
        Ok(())
    }

    /// 拒接：ringing → ended，不经过 active。
    /// 任何一方都可以拒绝响铃中的通话，这里不做身份过滤。
    pub fn reject(&mut self, now: Timestamp) -> DomainResult<()> {
        if self.status != CallStatus::Ringing {
            return Err(DomainError::InvalidCallTransition { action: "reject" });
        }

        self.status = CallStatus::Ended;
        self.ended_at = Some(now);
        Ok(())
    }

    /// 挂断：从任意状态进入 ended。
    ///
    /// 对已结束的通话再次调用是无害覆盖，不报错；
    /// 时长只在接通过（started_at 存在）时派生，且不会为负。
    pub fn end(&mut self, now: Timestamp) {
        self.status = CallStatus::Ended;
        self.ended_at = Some(now);
        self.duration_seconds = self
            .started_at
            .map(|started| (now - started).num_seconds().max(0));
    }

    /// 是否已经到达终态
    pub fn is_ended(&self) -> bool {
        self.status == CallStatus::Ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn session() -> CallSession {
        CallSession::ring(
            CallId::from(Uuid::new_v4()),
            RoomId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            CallType::Video,
            Utc::now(),
        )
    }

    #[test]
    fn test_accept_only_by_participant() {
        let mut call = session();
        let initiator = call.initiator_id;
        let participant = call.participant_id;

        // 发起方不能替对方接听
        assert!(call.accept(initiator, Utc::now()).is_err());
        assert_eq!(call.status, CallStatus::Ringing);

        call.accept(participant, Utc::now()).unwrap();
        assert_eq!(call.status, CallStatus::Active);
        assert!(call.started_at.is_some());
    }

    #[test]
    fn test_accept_requires_ringing() {
        let mut call = session();
        let participant = call.participant_id;
        call.end(Utc::now());

        // 终态之后 accept 无效
        assert!(call.accept(participant, Utc::now()).is_err());
        assert_eq!(call.status, CallStatus::Ended);
    }

    #[test]
    fn test_reject_short_circuits_to_ended() {
        let mut call = session();
        call.reject(Utc::now()).unwrap();

        assert_eq!(call.status, CallStatus::Ended);
        assert!(call.ended_at.is_some());
        // 从未接通，不产生时长
        assert_eq!(call.duration_seconds, None);
        assert!(call.reject(Utc::now()).is_err());
    }

    #[test]
    fn test_end_computes_whole_second_duration() {
        let mut call = session();
        let participant = call.participant_id;
        let accepted_at = Utc::now();

        call.accept(participant, accepted_at).unwrap();
        call.end(accepted_at + Duration::seconds(30));

        assert_eq!(call.status, CallStatus::Ended);
        assert_eq!(call.duration_seconds, Some(30));
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut call = session();
        let participant = call.participant_id;
        let accepted_at = Utc::now();

        call.accept(participant, accepted_at).unwrap();
        call.end(accepted_at + Duration::seconds(10));
        // 再挂一次只是覆盖，不会报错也不会出现负时长
        call.end(accepted_at + Duration::seconds(12));

        assert_eq!(call.duration_seconds, Some(12));
        assert!(call.is_ended());
    }

    #[test]
    fn test_end_never_negative() {
        let mut call = session();
        let participant = call.participant_id;
        let accepted_at = Utc::now();

        call.accept(participant, accepted_at).unwrap();
        // 时钟回拨时也不会算出负数
        call.end(accepted_at - Duration::seconds(5));
        assert_eq!(call.duration_seconds, Some(0));
    }

    #[test]
    fn test_end_without_accept_has_no_duration() {
        let mut call = session();
        call.end(Utc::now());
        assert_eq!(call.duration_seconds, None);
        assert!(call.ended_at.is_some());
    }
}
