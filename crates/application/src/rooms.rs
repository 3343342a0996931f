//! 房间成员管理
//!
//! 负责三件事：按 (学生, 导师) 组合创建/复用聊天室、认证成功后
//! 解析用户应订阅的房间集合、以及所有房间级事件共用的访问控制门。

use std::sync::Arc;

use domain::{
    ChatRoom, ChatRoomRepository, DomainError, MessageRepository, RoomId, User, UserId, UserStore,
};

use crate::clock::Clock;
use crate::error::ApplicationError;

pub struct RoomServiceDependencies {
    pub rooms: Arc<dyn ChatRoomRepository>,
    pub users: Arc<dyn UserStore>,
    pub messages: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct RoomService {
    deps: RoomServiceDependencies,
}

impl RoomService {
    pub fn new(deps: RoomServiceDependencies) -> Self {
        Self { deps }
    }

    /// 首次联系请求：查找或创建请求者与对方之间的聊天室。
    ///
    /// 两侧必须恰好是一名学生和一名导师；同一组合重复请求
    /// 返回已存在的房间，永远不会产生第二个。
    pub async fn open_conversation(
        &self,
        requester_id: UserId,
        counterpart_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        let requester = self
            .deps
            .users
            .find_by_id(requester_id)
            .await?
            .ok_or(ApplicationError::Authentication)?;
        let counterpart = self
            .deps
            .users
            .find_by_id(counterpart_id)
            .await?
            .ok_or(ApplicationError::NotFoundOrForbidden)?;

        let (student, advisor) = Self::classify(&requester, &counterpart)?;

        if let Some(existing) = self
            .deps
            .rooms
            .find_by_participants(student.id, advisor.id)
            .await?
        {
            return Ok(existing);
        }

        let now = self.deps.clock.now();
        let room = ChatRoom::new(RoomId::new(uuid::Uuid::new_v4()), student, advisor, now)?;
        let room = self.deps.rooms.create(room).await?;

        tracing::info!(
            room_id = %room.id,
            student_id = %room.student_id,
            advisor_id = %room.advisor_id,
            "创建聊天室"
        );

        Ok(room)
    }

    /// 认证成功后调用一次：该用户参与的全部房间，连接将订阅它们的扇出。
    pub async fn rooms_for(&self, user_id: UserId) -> Result<Vec<ChatRoom>, ApplicationError> {
        Ok(self.deps.rooms.list_for_user(user_id).await?)
    }

    /// 唯一的访问控制门：所有房间级事件（加入、发消息、取历史、
    /// 输入指示、标记已读、通话）动手之前都要先过这里。
    ///
    /// 返回房间本身，调用方可以直接在上面算出另一位参与者，
    /// 不用再查一次。房间不存在和不是参与者对外不作区分。
    pub async fn verify_access(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<ChatRoom, ApplicationError> {
        let room = self
            .deps
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or(ApplicationError::AccessDenied)?;

        if !room.is_participant(user_id) {
            return Err(ApplicationError::AccessDenied);
        }

        Ok(room)
    }

    /// 把某个房间设为连接的当前焦点房间。
    ///
    /// 这是成员资格之上的便利操作，不授予任何新能力；
    /// 顺带把房间里发给该用户且未送达的消息标记为已送达。
    pub async fn join_active(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<ChatRoom, ApplicationError> {
        let room = self.verify_access(user_id, room_id).await?;

        let delivered = self
            .deps
            .messages
            .mark_delivered(room.id, user_id)
            .await?;
        if delivered > 0 {
            tracing::debug!(room_id = %room.id, user_id = %user_id, delivered, "补记送达");
        }

        Ok(room)
    }

    /// 刷新房间的最近活动时间（发消息时由分发器调用）。
    pub async fn touch_activity(
        &self,
        room_id: RoomId,
        at: domain::Timestamp,
    ) -> Result<(), ApplicationError> {
        Ok(self.deps.rooms.touch_activity(room_id, at).await?)
    }

    /// 确定学生侧与导师侧。请求者可以是任意一侧。
    fn classify<'a>(
        requester: &'a User,
        counterpart: &'a User,
    ) -> Result<(&'a User, &'a User), ApplicationError> {
        if requester.is_student() && counterpart.is_advisor() {
            Ok((requester, counterpart))
        } else if requester.is_advisor() && counterpart.is_student() {
            Ok((counterpart, requester))
        } else {
            Err(DomainError::InvalidParticipants.into())
        }
    }
}
