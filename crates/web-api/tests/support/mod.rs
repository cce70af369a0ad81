use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use reqwest::Client;
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot, time::sleep};

use application::{
    BcryptPasswordHasher, Clock, ConversationService, ConversationServiceDependencies,
    EventBroadcaster, InMemoryConversationRepository, InMemoryMessageRepository,
    InMemoryNotificationRepository, InMemoryUserRepository, MessageService,
    MessageServiceDependencies, NotificationService, NotificationServiceDependencies,
    PasswordHasher, PresenceTracker, SystemClock, UserService, UserServiceDependencies,
};
use infrastructure::LocalEventBroadcaster;
use web_api::{router, AppState, JwtConfig, JwtService};

/// 在内存仓储上组装完整的路由，测试无需数据库。
pub fn build_router() -> Router {
    let users = InMemoryUserRepository::new();
    let conversations = InMemoryConversationRepository::new();
    let messages = InMemoryMessageRepository::new();
    let notifications = InMemoryNotificationRepository::new();

    let broadcaster = Arc::new(LocalEventBroadcaster::new(64));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher);

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: users.clone(),
        password_hasher,
        clock: clock.clone(),
    }));

    let conversation_service = Arc::new(ConversationService::new(ConversationServiceDependencies {
        conversation_repository: conversations.clone(),
        message_repository: messages.clone(),
        user_repository: users.clone(),
        clock: clock.clone(),
    }));

    let notification_service = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notification_repository: notifications,
        user_repository: users.clone(),
        broadcaster: broadcaster.clone() as Arc<dyn EventBroadcaster>,
        clock: clock.clone(),
    }));

    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: messages,
        conversation_repository: conversations,
        user_repository: users.clone(),
        notification_service: notification_service.clone(),
        broadcaster: broadcaster.clone() as Arc<dyn EventBroadcaster>,
        clock: clock.clone(),
    }));

    let presence = Arc::new(PresenceTracker::new(
        users,
        broadcaster.clone() as Arc<dyn EventBroadcaster>,
        clock,
    ));

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-key".to_string(),
        expiration_hours: 24,
    }));

    router(AppState {
        user_service,
        conversation_service,
        message_service,
        notification_service,
        presence,
        broadcaster,
        jwt_service,
    })
}

/// 启动测试服务器，返回监听地址和关闭句柄。
pub async fn spawn_server() -> (SocketAddr, oneshot::Sender<()>) {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // 等待服务器启动
    sleep(Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}

/// 注册用户，返回 (用户ID, token)。
pub async fn register(client: &Client, addr: SocketAddr, name: &str) -> (uuid::Uuid, String) {
    let body = client
        .post(format!("http://{}/api/v1/auth/register", addr))
        .json(&json!({
            "username": name,
            "email": format!("{name}@example.com"),
            "password": "secret-password"
        }))
        .send()
        .await
        .expect("register")
        .json::<serde_json::Value>()
        .await
        .expect("register json");

    let id = body["user"]["id"]
        .as_str()
        .expect("user id")
        .parse()
        .expect("uuid");
    let token = body["token"].as_str().expect("token").to_string();
    (id, token)
}
