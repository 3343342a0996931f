//! 基础设施层
//!
//! 持久化网关的 PostgreSQL 实现和 JWT 身份解析器。

pub mod auth;
pub mod db;

pub use auth::{JwtConfig, JwtIdentityResolver};
pub use db::{create_pg_pool, DbPool};
pub use db::repositories::{
    PgCallSessionRepository, PgChatRoomRepository, PgMessageRepository, PgPresenceRepository,
    PgReadReceiptRepository, PgTypingRepository, PgUserStore,
};
