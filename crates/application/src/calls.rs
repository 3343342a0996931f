//! 通话信令
//!
//! 协调单次通话的生命周期：ringing → active → ended，拒接从
//! ringing 直接短路到 ended。业务规则在领域实体上，并发下的强制
//! 执行靠存储层的过滤更新；accept 的更新未命中时不广播、不变更，
//! 而 reject/end 的会话更新是 fire-and-forget 的——即使持久化只
//! 部分成功也照样广播终止事件（沿用既有行为的不对称性，见
//! DESIGN.md）。

use std::sync::Arc;

use domain::{
    CallId, CallSession, CallSessionRepository, CallType, CallView, RoomId, ServerEvent, UserId,
};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomService;

pub struct CallServiceDependencies {
    pub rooms: Arc<RoomService>,
    pub calls: Arc<dyn CallSessionRepository>,
    pub registry: Arc<ConnectionRegistry>,
    pub clock: Arc<dyn Clock>,
}

pub struct CallService {
    deps: CallServiceDependencies,
}

impl CallService {
    pub fn new(deps: CallServiceDependencies) -> Self {
        Self { deps }
    }

    /// 发起通话：创建 ringing 会话并向房间广播 call_incoming。
    /// 被叫方按房间的另一位参与者计算，客户端提交的 receiverId 无视。
    pub async fn initiate(
        &self,
        room_id: RoomId,
        initiator_id: UserId,
        call_type: CallType,
    ) -> Result<CallSession, ApplicationError> {
        let room = self
            .deps
            .rooms
            .verify_access(initiator_id, room_id)
            .await?;
        let participant_id = room.other_participant(initiator_id)?;

        let session = CallSession::ring(
            CallId::new(uuid::Uuid::new_v4()),
            room.id,
            initiator_id,
            participant_id,
            call_type,
            self.deps.clock.now(),
        );
        let session = self.deps.calls.create(session).await?;

        tracing::info!(
            call_id = %session.id,
            room_id = %room.id,
            call_type = call_type.as_str(),
            "发起通话"
        );

        self.broadcast(&session, |call| ServerEvent::CallIncoming { call })
            .await;

        Ok(session)
    }

    /// 接听：过滤更新（status = ringing 且 participant 匹配）。
    /// 未命中时没有广播、没有状态变化，只给调用方回一个错误。
    pub async fn accept(
        &self,
        call_id: CallId,
        user_id: UserId,
    ) -> Result<CallSession, ApplicationError> {
        let started_at = self.deps.clock.now();
        let session = self
            .deps
            .calls
            .accept(call_id, user_id, started_at)
            .await?
            .ok_or(ApplicationError::NotFoundOrForbidden)?;

        self.broadcast(&session, |call| ServerEvent::CallAccepted { call })
            .await;

        Ok(session)
    }

    /// 拒接：任何一方都可以拒绝响铃中的通话，没有身份过滤
    /// （有意的宽松，和 accept 的严格过滤不对称）。
    /// 会话更新失败或未命中时照样广播 call_rejected。
    pub async fn reject(&self, call_id: CallId) -> Result<CallSession, ApplicationError> {
        let loaded = self
            .deps
            .calls
            .find_by_id(call_id)
            .await?
            .ok_or(ApplicationError::NotFoundOrForbidden)?;

        let now = self.deps.clock.now();
        let session = match self.deps.calls.reject(call_id, now).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                // 已经不在响铃中（被接通或已结束），广播仍然尽力而为
                tracing::debug!(call_id = %call_id, "拒接时会话已不在响铃中");
                let mut session = loaded;
                session.end(now);
                session
            }
            Err(err) => {
                tracing::error!(error = %err, call_id = %call_id, "拒接落库失败");
                let mut session = loaded;
                session.end(now);
                session
            }
        };

        self.broadcast(&session, |call| ServerEvent::CallRejected { call })
            .await;

        Ok(session)
    }

    /// 挂断：从任意状态进入 ended，接通过则按整秒派生时长。
    /// 对已结束的通话重复挂断是无害覆盖。会话更新 fire-and-forget，
    /// 失败只记日志，call_ended 照样广播。
    pub async fn end(
        &self,
        call_id: CallId,
        requester_id: UserId,
    ) -> Result<CallSession, ApplicationError> {
        let mut session = self
            .deps
            .calls
            .find_by_id(call_id)
            .await?
            .ok_or(ApplicationError::NotFoundOrForbidden)?;

        session.end(self.deps.clock.now());

        if let Err(err) = self.deps.calls.finish(&session).await {
            tracing::error!(error = %err, call_id = %call_id, "挂断落库失败");
        }

        tracing::info!(
            call_id = %call_id,
            requester_id = %requester_id,
            duration = ?session.duration_seconds,
            "通话结束"
        );

        self.broadcast(&session, |call| ServerEvent::CallEnded { call })
            .await;

        Ok(session)
    }

    async fn broadcast(&self, session: &CallSession, build: impl FnOnce(CallView) -> ServerEvent) {
        self.deps
            .registry
            .broadcast_room(session.room_id, build(CallView::from(session)), None)
            .await;
    }
}
