//! 已读回执Repository实现

use async_trait::async_trait;
use domain::{ReadReceipt, ReadReceiptRepository, RepositoryError, RepositoryResult};
use sqlx::query;
use uuid::Uuid;

use crate::db::DbPool;

pub struct PgReadReceiptRepository {
    pool: DbPool,
}

impl PgReadReceiptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadReceiptRepository for PgReadReceiptRepository {
    async fn upsert_many(&self, receipts: &[ReadReceipt]) -> RepositoryResult<()> {
        if receipts.is_empty() {
            return Ok(());
        }

        let message_ids: Vec<Uuid> = receipts.iter().map(|r| Uuid::from(r.message_id)).collect();
        let user_ids: Vec<Uuid> = receipts.iter().map(|r| Uuid::from(r.user_id)).collect();
        let read_ats: Vec<_> = receipts.iter().map(|r| r.read_at).collect();

        // 冲突时保留最早的回执时间，重复写入幂等
        query(
            r#"
            INSERT INTO read_receipts (message_id, user_id, read_at)
            SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::timestamptz[])
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(&message_ids)
        .bind(&user_ids)
        .bind(&read_ats)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(())
    }
}
