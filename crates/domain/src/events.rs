//! Socket 协议事件定义
//!
//! 双向帧格式统一为 `{"event": <名称>, "data": <负载>}`，
//! 负载字段按客户端约定使用 camelCase。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::call_session::{CallSession, CallStatus, CallType};
use crate::message::{Message, MessageType};
use crate::user::{User, UserRole};
use crate::value_objects::Timestamp;

/// 客户端到服务器的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// 认证，连接建立后的第一个事件，其余事件都要求已认证
    Authenticate { token: String },
    /// 将某个房间设为当前焦点房间
    JoinRoom { chat_room_id: Uuid },
    /// 离开当前焦点房间
    LeaveRoom { chat_room_id: Uuid },
    /// 发送消息
    SendMessage {
        chat_room_id: Uuid,
        content: String,
        #[serde(default)]
        message_type: Option<MessageType>,
        #[serde(default)]
        reply_to_message_id: Option<Uuid>,
        #[serde(default)]
        metadata: Option<Map<String, Value>>,
    },
    /// 开始输入
    TypingStart { chat_room_id: Uuid },
    /// 停止输入
    TypingStop { chat_room_id: Uuid },
    /// 批量标记已读
    MarkAsRead {
        chat_room_id: Uuid,
        message_ids: Vec<Uuid>,
    },
    /// 发起通话
    CallInitiate {
        chat_room_id: Uuid,
        #[serde(rename = "type")]
        call_type: CallType,
        receiver_id: Uuid,
    },
    /// 接听通话
    CallAccept { call_id: Uuid },
    /// 拒接通话
    CallReject { call_id: Uuid },
    /// 挂断通话
    CallEnd { call_id: Uuid },
}

/// 服务器到客户端的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// 认证成功
    Authenticated { user: UserView },
    /// 认证失败，连接保持未认证状态
    AuthError { message: String },
    /// 当前焦点房间切换成功
    RoomJoined { chat_room_id: Uuid },
    /// 离开焦点房间
    RoomLeft { chat_room_id: Uuid },
    /// 事件处理错误，只发给出错的连接
    Error { code: String, message: String },
    /// 新消息（房间广播）
    MessageReceived { message: MessageView },
    /// 发送确认（仅发送者，和房间广播相互独立）
    MessageSent {
        message_id: Uuid,
        chat_room_id: Uuid,
        created_at: Timestamp,
    },
    /// 对端输入状态变化
    UserTyping {
        chat_room_id: Uuid,
        user_id: Uuid,
        typing: bool,
    },
    /// 对端已读通知
    MessagesRead {
        chat_room_id: Uuid,
        message_ids: Vec<Uuid>,
        reader_id: Uuid,
        read_at: Timestamp,
    },
    /// 用户上线（全局广播）
    UserOnline { user_id: Uuid },
    /// 用户下线（全局广播）
    UserOffline {
        user_id: Uuid,
        last_seen_at: Timestamp,
    },
    /// 来电
    CallIncoming { call: CallView },
    /// 通话已接通
    CallAccepted { call: CallView },
    /// 通话被拒接
    CallRejected { call: CallView },
    /// 通话结束
    CallEnded { call: CallView },
}

impl ServerEvent {
    /// 构造一个只发给出错连接的错误事件
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// 用户展示信息，随消息和认证结果下发
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.into(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// 消息展示视图：完整消息加上双方的展示信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender: UserView,
    pub receiver: UserView,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to_message_id: Option<Uuid>,
    pub metadata: Map<String, Value>,
    pub is_read: bool,
    pub is_delivered: bool,
    pub is_edited: bool,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
}

impl MessageView {
    pub fn from_message(message: &Message, sender: &User, receiver: &User) -> Self {
        Self {
            id: message.id.into(),
            chat_room_id: message.room_id.into(),
            sender: UserView::from(sender),
            receiver: UserView::from(receiver),
            content: message.content.clone(),
            message_type: message.message_type,
            reply_to_message_id: message.reply_to_id.map(Into::into),
            metadata: message.metadata.clone(),
            is_read: message.is_read,
            is_delivered: message.is_delivered,
            is_edited: message.is_edited,
            created_at: message.created_at,
            edited_at: message.edited_at,
        }
    }
}

/// 通话会话展示视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallView {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub initiator_id: Uuid,
    pub participant_id: Uuid,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub status: CallStatus,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub duration_seconds: Option<i64>,
}

impl From<&CallSession> for CallView {
    fn from(call: &CallSession) -> Self {
        Self {
            id: call.id.into(),
            chat_room_id: call.room_id.into(),
            initiator_id: call.initiator_id.into(),
            participant_id: call.participant_id.into(),
            call_type: call.call_type,
            status: call.status,
            started_at: call.started_at,
            ended_at: call.ended_at,
            duration_seconds: call.duration_seconds,
        }
    }
}
