//! 聊天室Repository实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ChatRoom, ChatRoomRepository, RepositoryError, RepositoryResult, RoomId, Timestamp, UserId,
};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbChatRoom {
    pub id: Uuid,
    pub student_id: Uuid,
    pub advisor_id: Uuid,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DbChatRoom> for ChatRoom {
    fn from(row: DbChatRoom) -> Self {
        ChatRoom::from_parts(
            RoomId::from(row.id),
            UserId::from(row.student_id),
            UserId::from(row.advisor_id),
            row.last_activity_at,
            row.created_at,
        )
    }
}

pub struct PgChatRoomRepository {
    pool: DbPool,
}

impl PgChatRoomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRoomRepository for PgChatRoomRepository {
    async fn create(&self, room: ChatRoom) -> RepositoryResult<ChatRoom> {
        let row = query_as::<_, DbChatRoom>(
            r#"
            INSERT INTO chat_rooms (id, student_id, advisor_id, last_activity_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, student_id, advisor_id, last_activity_at, created_at
            "#,
        )
        .bind(Uuid::from(room.id))
        .bind(Uuid::from(room.student_id))
        .bind(Uuid::from(room.advisor_id))
        .bind(room.last_activity_at)
        .bind(room.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // (student_id, advisor_id) 唯一索引：先查后建输掉并发时在这里冒出来
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
            _ => RepositoryError::storage(e.to_string()),
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<ChatRoom>> {
        let row = query_as::<_, DbChatRoom>(
            r#"
            SELECT id, student_id, advisor_id, last_activity_at, created_at
            FROM chat_rooms
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_participants(
        &self,
        student_id: UserId,
        advisor_id: UserId,
    ) -> RepositoryResult<Option<ChatRoom>> {
        let row = query_as::<_, DbChatRoom>(
            r#"
            SELECT id, student_id, advisor_id, last_activity_at, created_at
            FROM chat_rooms
            WHERE student_id = $1 AND advisor_id = $2
            "#,
        )
        .bind(Uuid::from(student_id))
        .bind(Uuid::from(advisor_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<ChatRoom>> {
        let rows = query_as::<_, DbChatRoom>(
            r#"
            SELECT id, student_id, advisor_id, last_activity_at, created_at
            FROM chat_rooms
            WHERE student_id = $1 OR advisor_id = $1
            ORDER BY last_activity_at DESC
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn touch_activity(&self, id: RoomId, at: Timestamp) -> RepositoryResult<()> {
        query("UPDATE chat_rooms SET last_activity_at = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(())
    }
}
