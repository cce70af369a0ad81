//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    BcryptPasswordHasher, Clock, ConversationService, ConversationServiceDependencies,
    EventBroadcaster, MessageService, MessageServiceDependencies, NotificationService,
    NotificationServiceDependencies, PasswordHasher, PresenceTracker, SystemClock, UserService,
    UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, LocalEventBroadcaster, PgConversationRepository, PgMessageRepository,
    PgNotificationRepository, PgUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    if let Err(e) = config.validate() {
        // 开发默认配置允许弱密钥，只提示不中断
        tracing::warn!(error = %e, "configuration validation failed, continuing with dev defaults");
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 创建仓储
    let user_repository = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let conversation_repository = Arc::new(PgConversationRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let notification_repository = Arc::new(PgNotificationRepository::new(pg_pool));

    // 创建外部适配器
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let broadcaster = Arc::new(LocalEventBroadcaster::new(config.broadcast.capacity));

    // 创建应用层服务
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    }));

    let conversation_service = Arc::new(ConversationService::new(ConversationServiceDependencies {
        conversation_repository: conversation_repository.clone(),
        message_repository: message_repository.clone(),
        user_repository: user_repository.clone(),
        clock: clock.clone(),
    }));

    let notification_service = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notification_repository,
        user_repository: user_repository.clone(),
        broadcaster: broadcaster.clone() as Arc<dyn EventBroadcaster>,
        clock: clock.clone(),
    }));

    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository,
        conversation_repository,
        user_repository: user_repository.clone(),
        notification_service: notification_service.clone(),
        broadcaster: broadcaster.clone() as Arc<dyn EventBroadcaster>,
        clock: clock.clone(),
    }));

    let presence = Arc::new(PresenceTracker::new(
        user_repository,
        broadcaster.clone() as Arc<dyn EventBroadcaster>,
        clock,
    ));

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: config.jwt.secret,
        expiration_hours: config.jwt.expiration_hours,
    }));

    let state = AppState {
        user_service,
        conversation_service,
        message_service,
        notification_service,
        presence,
        broadcaster,
        jwt_service,
    };

    // 启动 Web 服务器
    let app = router(state);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("消息服务器启动在 http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
