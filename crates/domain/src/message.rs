//! 消息实体定义
//!
//! 消息属于且仅属于一个聊天室，接收者永远是房间内的另一位参与者。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{MessageId, RoomId, Timestamp, UserId};

/// 消息内容长度上限
const MAX_CONTENT_LEN: usize = 10_000;

/// 消息类型枚举
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// 文本消息
    #[default]
    Text,
    /// 文件消息
    File,
    /// 图片消息
    Image,
    /// 语音消息
    Voice,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::File => "file",
            MessageType::Image => "image",
            MessageType::Voice => "voice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(MessageType::Text),
            "file" => Some(MessageType::File),
            "image" => Some(MessageType::Image),
            "voice" => Some(MessageType::Voice),
            _ => None,
        }
    }
}

/// 开放的消息元数据（附件尺寸、语音时长等，不做强类型约束）
pub type MessageMetadata = Map<String, Value>;

/// 消息实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// 消息唯一ID
    pub id: MessageId,
    /// 所属聊天室ID
    pub room_id: RoomId,
    /// 发送者ID
    pub sender_id: UserId,
    /// 接收者ID（房间内的另一位参与者，服务端计算）
    pub receiver_id: UserId,
    /// 消息内容
    pub content: String,
    /// 消息类型
    pub message_type: MessageType,
    /// 回复的消息ID（可选，须在同一房间内）
    pub reply_to_id: Option<MessageId>,
    /// 元数据
    pub metadata: MessageMetadata,
    /// 接收者是否已读
    pub is_read: bool,
    /// 是否已送达
    pub is_delivered: bool,
    /// 是否被编辑过
    pub is_edited: bool,
    /// 发送时间
    pub created_at: Timestamp,
    /// 编辑时间
    pub edited_at: Option<Timestamp>,
}

impl Message {
    /// 创建新消息，内容在此处完成校验。
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MessageId,
        room_id: RoomId,
        sender_id: UserId,
        receiver_id: UserId,
        content: impl Into<String>,
        message_type: MessageType,
        reply_to_id: Option<MessageId>,
        metadata: Option<MessageMetadata>,
        now: Timestamp,
    ) -> DomainResult<Self> {
        let content = content.into();
        Self::validate_content(&content)?;

        Ok(Self {
            id,
            room_id,
            sender_id,
            receiver_id,
            content,
            message_type,
            reply_to_id,
            metadata: metadata.unwrap_or_default(),
            is_read: false,
            is_delivered: false,
            is_edited: false,
            created_at: now,
            edited_at: None,
        })
    }

    /// 编辑消息内容。所有权（只有发送者可编辑）由存储层的过滤更新保证，
    /// 此处只负责内容校验和状态翻转。
    pub fn apply_edit(&mut self, new_content: impl Into<String>, now: Timestamp) -> DomainResult<()> {
        let new_content = new_content.into();
        Self::validate_content(&new_content)?;

        self.content = new_content;
        self.is_edited = true;
        self.edited_at = Some(now);
        Ok(())
    }

    /// 标记为已读（只有接收者可触发，同样由存储层过滤保证）
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }

    /// 标记为已送达
    pub fn mark_delivered(&mut self) {
        self.is_delivered = true;
    }

    /// 检查是否为回复消息
    pub fn is_reply(&self) -> bool {
        self.reply_to_id.is_some()
    }

    /// 验证消息内容
    pub fn validate_content(content: &str) -> DomainResult<()> {
        if content.trim().is_empty() {
            return Err(DomainError::invalid_argument("content", "消息内容不能为空"));
        }
        if content.len() > MAX_CONTENT_LEN {
            return Err(DomainError::invalid_argument(
                "content",
                "消息内容不能超过10000个字符",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn build(content: &str) -> DomainResult<Message> {
        Message::new(
            MessageId::from(Uuid::new_v4()),
            RoomId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            content,
            MessageType::Text,
            None,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_new_message_defaults() {
        let message = build("Hello").unwrap();
        assert!(!message.is_read);
        assert!(!message.is_delivered);
        assert!(!message.is_edited);
        assert!(message.metadata.is_empty());
        assert!(!message.is_reply());
    }

    #[test]
    fn test_content_validation() {
        assert!(build("Valid message").is_ok());
        assert!(build(&"A".repeat(10_000)).is_ok());

        assert!(build("").is_err());
        assert!(build("   ").is_err());
        assert!(build(&"A".repeat(10_001)).is_err());
    }

    #[test]
    fn test_apply_edit() {
        let mut message = build("Original").unwrap();
        message.apply_edit("Updated", Utc::now()).unwrap();

        assert_eq!(message.content, "Updated");
        assert!(message.is_edited);
        assert!(message.edited_at.is_some());

        // 编辑内容同样要过校验
        assert!(message.apply_edit("", Utc::now()).is_err());
        assert_eq!(message.content, "Updated");
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut metadata = MessageMetadata::new();
        metadata.insert("fileName".into(), Value::String("cv.pdf".into()));
        metadata.insert("fileSize".into(), Value::from(20480));

        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            RoomId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            "cv.pdf",
            MessageType::File,
            None,
            Some(metadata),
            Utc::now(),
        )
        .unwrap();

        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, back);
        assert_eq!(back.metadata["fileName"], "cv.pdf");
    }

    #[test]
    fn test_message_type_parse() {
        for ty in [
            MessageType::Text,
            MessageType::File,
            MessageType::Image,
            MessageType::Voice,
        ] {
            assert_eq!(MessageType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(MessageType::parse("sticker"), None);
    }
}
