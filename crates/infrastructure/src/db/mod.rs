pub mod repositories;

use sqlx::postgres::PgPoolOptions;

/// 全局共享的 PostgreSQL 连接池类型
pub type DbPool = sqlx::PgPool;

/// 创建 PostgreSQL 连接池
pub async fn create_pg_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}
