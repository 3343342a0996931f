//! REST 路由
//!
//! socket 层之外的伴随 HTTP 接口：房间列表、分页历史、编辑/删除。
//! 访问规则和 socket 层完全一致，都走 RoomService::verify_access。

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use domain::{ChatRoom, Message, MessageId, MessageType, RoomId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

/// 默认分页大小
const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// 单页上限
const MAX_HISTORY_LIMIT: u32 = 200;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/{room_id}/messages", get(message_history))
        .route("/messages/{message_id}", put(edit_message).delete(delete_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    participant_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomView {
    id: Uuid,
    student_id: Uuid,
    advisor_id: Uuid,
    last_activity_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ChatRoom> for RoomView {
    fn from(room: ChatRoom) -> Self {
        Self {
            id: room.id.into(),
            student_id: room.student_id.into(),
            advisor_id: room.advisor_id.into(),
            last_activity_at: room.last_activity_at,
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRow {
    id: Uuid,
    chat_room_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    message_type: MessageType,
    reply_to_message_id: Option<Uuid>,
    metadata: Map<String, Value>,
    is_read: bool,
    is_delivered: bool,
    is_edited: bool,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
}

impl From<Message> for MessageRow {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.into(),
            chat_room_id: message.room_id.into(),
            sender_id: message.sender_id.into(),
            receiver_id: message.receiver_id.into(),
            content: message.content,
            message_type: message.message_type,
            reply_to_message_id: message.reply_to_id.map(Into::into),
            metadata: message.metadata,
            is_read: message.is_read,
            is_delivered: message.is_delivered,
            is_edited: message.is_edited,
            created_at: message.created_at,
            edited_at: message.edited_at,
        }
    }
}

/// 首次联系请求：查找或创建与对方的聊天室
async fn create_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomView>, ApiError> {
    let room = state
        .rooms
        .open_conversation(user.id, UserId::from(request.participant_id))
        .await?;
    Ok(Json(room.into()))
}

/// 当前用户参与的全部房间
async fn list_rooms(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<RoomView>>, ApiError> {
    let rooms = state.rooms.rooms_for(user.id).await?;
    Ok(Json(rooms.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
    /// 向前翻页的消息ID游标
    before: Option<Uuid>,
}

/// 房间历史，按创建时间倒序
async fn message_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageRow>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    let messages = state
        .chat
        .history(
            user.id,
            RoomId::from(room_id),
            limit,
            query.before.map(MessageId::from),
        )
        .await?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
struct EditMessageRequest {
    content: String,
}

/// 编辑消息，只有发送者可以
async fn edit_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<Uuid>,
    Json(request): Json<EditMessageRequest>,
) -> Result<Json<MessageRow>, ApiError> {
    let message = state
        .chat
        .edit(MessageId::from(message_id), user.id, &request.content)
        .await?;
    Ok(Json(message.into()))
}

/// 删除消息，只有发送者可以；未命中时也返回 204（幂等）
async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.chat.delete(MessageId::from(message_id), user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 存活探针
pub async fn health() -> &'static str {
    "OK"
}
