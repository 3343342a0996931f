//! 输入状态Repository实现

use async_trait::async_trait;
use domain::{
    RepositoryError, RepositoryResult, RoomId, TypingIndicator, TypingRepository, UserId,
};
use sqlx::{query, query_scalar};
use uuid::Uuid;

use crate::db::DbPool;

pub struct PgTypingRepository {
    pool: DbPool,
}

impl PgTypingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TypingRepository for PgTypingRepository {
    async fn upsert(&self, indicator: TypingIndicator) -> RepositoryResult<()> {
        query(
            r#"
            INSERT INTO typing_indicators (room_id, user_id, is_typing, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (room_id, user_id)
            DO UPDATE SET is_typing = EXCLUDED.is_typing, updated_at = NOW()
            "#,
        )
        .bind(Uuid::from(indicator.room_id))
        .bind(Uuid::from(indicator.user_id))
        .bind(indicator.is_typing)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, room_id: RoomId, user_id: UserId) -> RepositoryResult<()> {
        query("DELETE FROM typing_indicators WHERE room_id = $1 AND user_id = $2")
            .bind(Uuid::from(room_id))
            .bind(Uuid::from(user_id))
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<RoomId>> {
        let rooms: Vec<Uuid> = query_scalar(
            "DELETE FROM typing_indicators WHERE user_id = $1 RETURNING room_id",
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(rooms.into_iter().map(RoomId::from).collect())
    }
}
