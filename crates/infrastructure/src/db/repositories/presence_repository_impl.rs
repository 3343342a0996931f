//! 在线状态Repository实现

use async_trait::async_trait;
use domain::{PresenceRecord, PresenceRepository, RepositoryError, RepositoryResult};
use sqlx::query;
use uuid::Uuid;

use crate::db::DbPool;

pub struct PgPresenceRepository {
    pool: DbPool,
}

impl PgPresenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceRepository for PgPresenceRepository {
    async fn upsert(&self, record: PresenceRecord) -> RepositoryResult<()> {
        query(
            r#"
            INSERT INTO presence_records (user_id, status, last_seen_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET status = EXCLUDED.status, last_seen_at = EXCLUDED.last_seen_at
            "#,
        )
        .bind(Uuid::from(record.user_id))
        .bind(record.status.as_str())
        .bind(record.last_seen_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(())
    }
}
