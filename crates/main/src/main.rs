//! 主应用程序入口
//!
//! 启动 ScholarConnect 实时核心服务。

use std::sync::Arc;

use application::{
    CallService, CallServiceDependencies, ChatService, ChatServiceDependencies, Clock,
    ConnectionRegistry, PresenceRegistry, RoomService, RoomServiceDependencies, SystemClock,
    TypingTracker,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, JwtConfig, JwtIdentityResolver, PgCallSessionRepository, PgChatRoomRepository,
    PgMessageRepository, PgPresenceRepository, PgReadReceiptRepository, PgTypingRepository,
    PgUserStore,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取并校验配置
    let config = AppConfig::from_env();
    config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 持久化网关
    let users = Arc::new(PgUserStore::new(pg_pool.clone()));
    let rooms_repo = Arc::new(PgChatRoomRepository::new(pg_pool.clone()));
    let messages = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let receipts = Arc::new(PgReadReceiptRepository::new(pg_pool.clone()));
    let presence_repo = Arc::new(PgPresenceRepository::new(pg_pool.clone()));
    let typing_repo = Arc::new(PgTypingRepository::new(pg_pool.clone()));
    let calls_repo = Arc::new(PgCallSessionRepository::new(pg_pool));

    // 进程内共享状态
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(ConnectionRegistry::new());
    let presence = Arc::new(PresenceRegistry::new(
        presence_repo,
        registry.clone(),
        clock.clone(),
    ));

    // 应用服务
    let rooms = Arc::new(RoomService::new(RoomServiceDependencies {
        rooms: rooms_repo,
        users: users.clone(),
        messages: messages.clone(),
        clock: clock.clone(),
    }));
    let chat = Arc::new(ChatService::new(ChatServiceDependencies {
        rooms: rooms.clone(),
        users: users.clone(),
        messages,
        receipts,
        registry: registry.clone(),
        clock: clock.clone(),
    }));
    let typing = Arc::new(TypingTracker::new(typing_repo, registry.clone()));
    let calls = Arc::new(CallService::new(CallServiceDependencies {
        rooms: rooms.clone(),
        calls: calls_repo,
        registry: registry.clone(),
        clock,
    }));

    // 身份解析
    let identity = Arc::new(JwtIdentityResolver::new(
        JwtConfig {
            secret: config.jwt.secret.clone(),
            expiration_hours: config.jwt.expiration_hours,
        },
        users,
    ));

    let state = AppState::new(identity, rooms, chat, typing, calls, presence, registry);

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("实时核心服务启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
