//! 消息Repository实现
//!
//! 所有权约束（发送者才能编辑/删除、接收者才能标记已读）直接
//! 编码为 UPDATE/DELETE 的 WHERE 条件，单行过滤更新在存储层
//! 是原子的，进程内不需要额外互斥。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Message, MessageId, MessageMetadata, MessageRepository, MessageType, RepositoryError,
    RepositoryResult, RoomId, Timestamp, UserId,
};
use serde_json::Value as JsonValue;
use sqlx::{query, query_as, query_scalar, FromRow};
use uuid::Uuid;

use crate::db::DbPool;

/// 数据库消息模型
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub reply_to_id: Option<Uuid>,
    pub metadata: JsonValue,
    pub is_read: bool,
    pub is_delivered: bool,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, receiver_id, content, message_type, \
     reply_to_id, metadata, is_read, is_delivered, is_edited, created_at, edited_at";

impl From<DbMessage> for Message {
    fn from(row: DbMessage) -> Self {
        let metadata: MessageMetadata = match row.metadata {
            JsonValue::Object(map) => map,
            _ => MessageMetadata::new(),
        };

        Message {
            id: MessageId::from(row.id),
            room_id: RoomId::from(row.room_id),
            sender_id: UserId::from(row.sender_id),
            receiver_id: UserId::from(row.receiver_id),
            content: row.content,
            message_type: MessageType::parse(&row.message_type).unwrap_or_default(),
            reply_to_id: row.reply_to_id.map(MessageId::from),
            metadata,
            is_read: row.is_read,
            is_delivered: row.is_delivered,
            is_edited: row.is_edited,
            created_at: row.created_at,
            edited_at: row.edited_at,
        }
    }
}

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> RepositoryResult<Message> {
        let row = query_as::<_, DbMessage>(&format!(
            r#"
            INSERT INTO messages ({MESSAGE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.sender_id))
        .bind(Uuid::from(message.receiver_id))
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.reply_to_id.map(Uuid::from))
        .bind(JsonValue::Object(message.metadata.clone()))
        .bind(message.is_read)
        .bind(message.is_delivered)
        .bind(message.is_edited)
        .bind(message.created_at)
        .bind(message.edited_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        let row = query_as::<_, DbMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1",
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn list_recent(
        &self,
        room_id: RoomId,
        limit: u32,
        before: Option<MessageId>,
    ) -> RepositoryResult<Vec<Message>> {
        let rows = match before {
            Some(before) => {
                query_as::<_, DbMessage>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM messages
                    WHERE room_id = $1
                      AND created_at < (SELECT created_at FROM messages WHERE id = $2)
                    ORDER BY created_at DESC
                    LIMIT $3
                    "#,
                ))
                .bind(Uuid::from(room_id))
                .bind(Uuid::from(before))
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                query_as::<_, DbMessage>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM messages
                    WHERE room_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#,
                ))
                .bind(Uuid::from(room_id))
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_content(
        &self,
        id: MessageId,
        sender_id: UserId,
        content: &str,
        edited_at: Timestamp,
    ) -> RepositoryResult<Option<Message>> {
        let row = query_as::<_, DbMessage>(&format!(
            r#"
            UPDATE messages
            SET content = $3, is_edited = TRUE, edited_at = $4
            WHERE id = $1 AND sender_id = $2
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(id))
        .bind(Uuid::from(sender_id))
        .bind(content)
        .bind(edited_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn delete_by_sender(&self, id: MessageId, sender_id: UserId) -> RepositoryResult<bool> {
        let result = query("DELETE FROM messages WHERE id = $1 AND sender_id = $2")
            .bind(Uuid::from(id))
            .bind(Uuid::from(sender_id))
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_read(
        &self,
        room_id: RoomId,
        message_ids: &[MessageId],
        receiver_id: UserId,
    ) -> RepositoryResult<Vec<MessageId>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = message_ids.iter().map(|id| Uuid::from(*id)).collect();
        let flipped: Vec<Uuid> = query_scalar(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE id = ANY($1)
              AND room_id = $2
              AND receiver_id = $3
              AND is_read = FALSE
            RETURNING id
            "#,
        )
        .bind(&ids)
        .bind(Uuid::from(room_id))
        .bind(Uuid::from(receiver_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(flipped.into_iter().map(MessageId::from).collect())
    }

    async fn mark_delivered(&self, room_id: RoomId, receiver_id: UserId) -> RepositoryResult<u64> {
        let result = query(
            r#"
            UPDATE messages
            SET is_delivered = TRUE
            WHERE room_id = $1 AND receiver_id = $2 AND is_delivered = FALSE
            "#,
        )
        .bind(Uuid::from(room_id))
        .bind(Uuid::from(receiver_id))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
