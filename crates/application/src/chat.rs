//! 消息分发器
//!
//! 校验、落库、扇出。房间内同一发送者的消息按 send 被接受的顺序
//! 落库和广播（每个连接的入站事件在自己的任务里串行处理，这里
//! 不再额外排序）；不同发送者之间的相对顺序不做承诺，客户端按
//! 消息自带的时间戳/ID 排序展示。

use std::sync::Arc;

use domain::{
    ConnectionId, DomainError, Message, MessageId, MessageMetadata, MessageRepository, MessageType,
    MessageView, ReadReceipt, ReadReceiptRepository, RoomId, ServerEvent, User, UserId, UserStore,
};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomService;

pub struct ChatServiceDependencies {
    pub rooms: Arc<RoomService>,
    pub users: Arc<dyn UserStore>,
    pub messages: Arc<dyn MessageRepository>,
    pub receipts: Arc<dyn ReadReceiptRepository>,
    pub registry: Arc<ConnectionRegistry>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to_id: Option<MessageId>,
    pub metadata: Option<MessageMetadata>,
    /// 发送者自己的连接，用于投递 message_sent 确认。
    /// 确认独立于房间广播：发送者会同时收到两者。
    pub origin: Option<ConnectionId>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 发送消息。
    ///
    /// 接收者永远按"房间内的另一位参与者"计算，客户端提交的
    /// 接收者一律无视。落库失败只报给发送者，不重试，由客户端
    /// 决定是否重发。
    pub async fn send(&self, request: SendMessageRequest) -> Result<Message, ApplicationError> {
        let room = self
            .deps
            .rooms
            .verify_access(request.sender_id, request.room_id)
            .await?;
        let receiver_id = room.other_participant(request.sender_id)?;

        // 回复目标必须在同一个房间里
        if let Some(reply_to) = request.reply_to_id {
            let parent = self.deps.messages.find_by_id(reply_to).await?;
            match parent {
                Some(parent) if parent.room_id == room.id => {}
                _ => {
                    return Err(DomainError::invalid_argument(
                        "replyToMessageId",
                        "被回复的消息不在该房间内",
                    )
                    .into())
                }
            }
        }

        let now = self.deps.clock.now();
        let message = Message::new(
            MessageId::new(uuid::Uuid::new_v4()),
            room.id,
            request.sender_id,
            receiver_id,
            request.content,
            request.message_type,
            request.reply_to_id,
            request.metadata,
            now,
        )?;

        let message = self.deps.messages.create(message).await?;

        if let Err(err) = self.deps.rooms.touch_activity(room.id, now).await {
            tracing::warn!(error = %err, room_id = %room.id, "刷新房间活动时间失败");
        }

        // 附上双方展示信息后扇出给房间内的所有连接
        let sender = self.display_user(request.sender_id).await?;
        let receiver = self.display_user(receiver_id).await?;
        let view = MessageView::from_message(&message, &sender, &receiver);

        self.deps
            .registry
            .broadcast_room(room.id, ServerEvent::MessageReceived { message: view }, None)
            .await;

        if let Some(origin) = request.origin {
            self.deps
                .registry
                .send_to_connection(
                    origin,
                    ServerEvent::MessageSent {
                        message_id: message.id.into(),
                        chat_room_id: room.id.into(),
                        created_at: message.created_at,
                    },
                )
                .await;
        }

        Ok(message)
    }

    /// 编辑消息。所有权检查编码为更新过滤条件而不是前置查询：
    /// 未命中任何行统一报 NotFoundOrForbidden，不区分"消息不存在"
    /// 和"不是发送者"。
    pub async fn edit(
        &self,
        message_id: MessageId,
        requester_id: UserId,
        new_content: &str,
    ) -> Result<Message, ApplicationError> {
        Message::validate_content(new_content)?;

        let edited_at = self.deps.clock.now();
        let updated = self
            .deps
            .messages
            .update_content(message_id, requester_id, new_content, edited_at)
            .await?;

        updated.ok_or(ApplicationError::NotFoundOrForbidden)
    }

    /// 删除消息。同样的所有权过滤；未命中时静默返回，
    /// 从客户端角度看删除是幂等的。
    pub async fn delete(
        &self,
        message_id: MessageId,
        requester_id: UserId,
    ) -> Result<(), ApplicationError> {
        let removed = self
            .deps
            .messages
            .delete_by_sender(message_id, requester_id)
            .await?;
        if !removed {
            tracing::debug!(message_id = %message_id, requester_id = %requester_id, "删除未命中");
        }
        Ok(())
    }

    /// 批量标记已读。只有接收者能翻转 is_read（过滤更新），
    /// 然后幂等写入回执，最后把实际翻转的ID列表通知房间的
    /// 另一位参与者。
    pub async fn mark_many_read(
        &self,
        room_id: RoomId,
        message_ids: &[MessageId],
        requester_id: UserId,
    ) -> Result<Vec<MessageId>, ApplicationError> {
        let room = self
            .deps
            .rooms
            .verify_access(requester_id, room_id)
            .await?;

        let flipped = self
            .deps
            .messages
            .mark_read(room.id, message_ids, requester_id)
            .await?;
        if flipped.is_empty() {
            return Ok(flipped);
        }

        let read_at = self.deps.clock.now();
        let receipts: Vec<ReadReceipt> = flipped
            .iter()
            .map(|id| ReadReceipt::new(*id, requester_id, read_at))
            .collect();
        self.deps.receipts.upsert_many(&receipts).await?;

        let other = room.other_participant(requester_id)?;
        self.deps
            .registry
            .send_to_user(
                other,
                ServerEvent::MessagesRead {
                    chat_room_id: room.id.into(),
                    message_ids: flipped.iter().map(|id| (*id).into()).collect(),
                    reader_id: requester_id.into(),
                    read_at,
                },
            )
            .await;

        Ok(flipped)
    }

    /// 房间历史，按时间倒序，`before` 为向前翻页的游标。
    pub async fn history(
        &self,
        requester_id: UserId,
        room_id: RoomId,
        limit: u32,
        before: Option<MessageId>,
    ) -> Result<Vec<Message>, ApplicationError> {
        let room = self
            .deps
            .rooms
            .verify_access(requester_id, room_id)
            .await?;
        Ok(self.deps.messages.list_recent(room.id, limit, before).await?)
    }

    async fn display_user(&self, user_id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApplicationError::NotFoundOrForbidden)
    }
}
