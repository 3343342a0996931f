//! 通话会话Repository实现
//!
//! accept/reject 的状态转换编码为过滤更新：并发的 accept 和
//! reject 里只有一个能命中 status = 'ringing' 的行。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    CallId, CallSession, CallSessionRepository, CallStatus, CallType, RepositoryError,
    RepositoryResult, RoomId, Timestamp, UserId,
};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbCallSession {
    pub id: Uuid,
    pub room_id: Uuid,
    pub initiator_id: Uuid,
    pub participant_id: Uuid,
    pub call_type: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

const CALL_COLUMNS: &str = "id, room_id, initiator_id, participant_id, call_type, status, \
     started_at, ended_at, duration_seconds, created_at";

impl From<DbCallSession> for CallSession {
    fn from(row: DbCallSession) -> Self {
        CallSession {
            id: CallId::from(row.id),
            room_id: RoomId::from(row.room_id),
            initiator_id: UserId::from(row.initiator_id),
            participant_id: UserId::from(row.participant_id),
            call_type: CallType::parse(&row.call_type).unwrap_or(CallType::Voice),
            status: CallStatus::parse(&row.status).unwrap_or(CallStatus::Ended),
            started_at: row.started_at,
            ended_at: row.ended_at,
            duration_seconds: row.duration_seconds,
            created_at: row.created_at,
        }
    }
}

pub struct PgCallSessionRepository {
    pool: DbPool,
}

impl PgCallSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallSessionRepository for PgCallSessionRepository {
    async fn create(&self, session: CallSession) -> RepositoryResult<CallSession> {
        let row = query_as::<_, DbCallSession>(&format!(
            r#"
            INSERT INTO call_sessions ({CALL_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CALL_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(session.id))
        .bind(Uuid::from(session.room_id))
        .bind(Uuid::from(session.initiator_id))
        .bind(Uuid::from(session.participant_id))
        .bind(session.call_type.as_str())
        .bind(session.status.as_str())
        .bind(session.started_at)
        .bind(session.ended_at)
        .bind(session.duration_seconds)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: CallId) -> RepositoryResult<Option<CallSession>> {
        let row = query_as::<_, DbCallSession>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_sessions WHERE id = $1",
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn accept(
        &self,
        id: CallId,
        participant_id: UserId,
        started_at: Timestamp,
    ) -> RepositoryResult<Option<CallSession>> {
        let row = query_as::<_, DbCallSession>(&format!(
            r#"
            UPDATE call_sessions
            SET status = 'active', started_at = $3
            WHERE id = $1 AND participant_id = $2 AND status = 'ringing'
            RETURNING {CALL_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(id))
        .bind(Uuid::from(participant_id))
        .bind(started_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn reject(&self, id: CallId, ended_at: Timestamp) -> RepositoryResult<Option<CallSession>> {
        let row = query_as::<_, DbCallSession>(&format!(
            r#"
            UPDATE call_sessions
            SET status = 'ended', ended_at = $2
            WHERE id = $1 AND status = 'ringing'
            RETURNING {CALL_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(id))
        .bind(ended_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn finish(&self, session: &CallSession) -> RepositoryResult<()> {
        query(
            r#"
            UPDATE call_sessions
            SET status = $2, ended_at = $3, duration_seconds = $4
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(session.id))
        .bind(session.status.as_str())
        .bind(session.ended_at)
        .bind(session.duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(())
    }
}
