//! 用户存储实现（只读）

use async_trait::async_trait;
use domain::{RepositoryError, RepositoryResult, User, UserId, UserRole, UserStore};
use sqlx::{query_as, FromRow};
use uuid::Uuid;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub avatar_url: Option<String>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        // 角色列有 CHECK 约束，未知值按最小权限处理
        let role = UserRole::parse(&row.role).unwrap_or(UserRole::Student);
        User::new(UserId::from(row.id), row.name, role, row.avatar_url)
    }
}

pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        let row = query_as::<_, DbUser>(
            r#"
            SELECT id, name, role, avatar_url
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }
}
