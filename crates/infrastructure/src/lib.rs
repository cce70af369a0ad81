//! 基础设施层实现。
//!
//! 提供 Postgres 仓储与进程内事件广播，落实应用/领域层定义的接口。

pub mod broadcast;
pub mod repository;

pub use broadcast::{EventStream, LocalEventBroadcaster};
pub use repository::{
    create_pg_pool, PgConversationRepository, PgMessageRepository, PgNotificationRepository,
    PgUserRepository,
};
