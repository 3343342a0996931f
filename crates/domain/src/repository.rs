//! 持久化网关接口
//!
//! 核心的所有持久化操作都通过这里的 trait 表达：按行过滤的
//! select / insert / update / delete / upsert。所有权类过滤
//! （例如"只有发送者能编辑"）直接编码为更新条件，调用方通过
//! 返回值区分"过滤未命中"。

use async_trait::async_trait;

use crate::call_session::CallSession;
use crate::chat_room::ChatRoom;
use crate::errors::RepositoryResult;
use crate::message::Message;
use crate::presence::PresenceRecord;
use crate::read_receipt::ReadReceipt;
use crate::typing::TypingIndicator;
use crate::user::User;
use crate::value_objects::{CallId, MessageId, RoomId, Timestamp, UserId};

/// 用户存储（本核心只读）
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
}

/// 聊天室存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    async fn create(&self, room: ChatRoom) -> RepositoryResult<ChatRoom>;

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<ChatRoom>>;

    /// 按 (学生, 导师) 组合查找，先查后建保证组合唯一
    async fn find_by_participants(
        &self,
        student_id: UserId,
        advisor_id: UserId,
    ) -> RepositoryResult<Option<ChatRoom>>;

    /// 用户参与的全部聊天室（学生侧或导师侧）
    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<ChatRoom>>;

    /// 刷新最近活动时间
    async fn touch_activity(&self, id: RoomId, at: Timestamp) -> RepositoryResult<()>;
}

/// 消息存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> RepositoryResult<Message>;

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>>;

    /// 房间历史，按创建时间倒序，`before` 为向前翻页的游标
    async fn list_recent(
        &self,
        room_id: RoomId,
        limit: u32,
        before: Option<MessageId>,
    ) -> RepositoryResult<Vec<Message>>;

    /// 过滤更新：只在 sender_id 匹配时生效。
    /// 返回 None 表示没有命中（消息不存在或请求者不是发送者，二者不区分）。
    async fn update_content(
        &self,
        id: MessageId,
        sender_id: UserId,
        content: &str,
        edited_at: Timestamp,
    ) -> RepositoryResult<Option<Message>>;

    /// 过滤删除：只在 sender_id 匹配时生效，未命中时静默。
    /// 返回是否确实删掉了一行。
    async fn delete_by_sender(&self, id: MessageId, sender_id: UserId) -> RepositoryResult<bool>;

    /// 过滤更新 is_read：只有 receiver_id 匹配的行会翻转。
    /// 返回实际翻转的消息ID。
    async fn mark_read(
        &self,
        room_id: RoomId,
        message_ids: &[MessageId],
        receiver_id: UserId,
    ) -> RepositoryResult<Vec<MessageId>>;

    /// 将房间内发给该用户且未送达的消息标记为已送达，返回影响的行数
    async fn mark_delivered(&self, room_id: RoomId, receiver_id: UserId) -> RepositoryResult<u64>;
}

/// 已读回执存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ReadReceiptRepository: Send + Sync {
    /// 幂等 upsert，一条回执写多次没有副作用
    async fn upsert_many(&self, receipts: &[ReadReceipt]) -> RepositoryResult<()>;
}

/// 在线状态存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    async fn upsert(&self, record: PresenceRecord) -> RepositoryResult<()>;
}

/// 输入状态存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait TypingRepository: Send + Sync {
    async fn upsert(&self, indicator: TypingIndicator) -> RepositoryResult<()>;

    async fn delete(&self, room_id: RoomId, user_id: UserId) -> RepositoryResult<()>;

    /// 清掉某个用户的全部输入指示（断开连接时），返回受影响的房间
    async fn delete_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<RoomId>>;
}

/// 通话会话存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait CallSessionRepository: Send + Sync {
    async fn create(&self, session: CallSession) -> RepositoryResult<CallSession>;

    async fn find_by_id(&self, id: CallId) -> RepositoryResult<Option<CallSession>>;

    /// 过滤更新：仅当 status = ringing 且 participant_id 匹配时接通。
    /// 返回 None 表示没有命中（会话不存在、已不在响铃中、或请求者不是被叫方）。
    async fn accept(
        &self,
        id: CallId,
        participant_id: UserId,
        started_at: Timestamp,
    ) -> RepositoryResult<Option<CallSession>>;

    /// 过滤更新：仅当 status = ringing 时拒接，不检查请求者身份。
    async fn reject(&self, id: CallId, ended_at: Timestamp) -> RepositoryResult<Option<CallSession>>;

    /// 无条件覆盖为终态（status/ended_at/duration），重复调用是无害覆盖
    async fn finish(&self, session: &CallSession) -> RepositoryResult<()>;
}
