//! 应用层实现。
//!
//! 围绕领域模型的用例服务：会话、消息投递、已读回执、通知扇出、
//! 在线状态，以及对外部适配器（密码哈希、事件广播、时钟）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod dto;
pub mod error;
pub mod memory;
pub mod password;
pub mod presence;
pub mod services;

pub use broadcaster::{
    Address, BroadcastError, EventBroadcaster, EventEnvelope, RecordingBroadcaster, ServerEvent,
    UnwiredBroadcaster,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dto::{ConversationView, MessagePage, MessageView, NotificationPage, NotificationView};
pub use error::ApplicationError;
pub use memory::{
    InMemoryConversationRepository, InMemoryMessageRepository, InMemoryNotificationRepository,
    InMemoryUserRepository,
};
pub use password::{BcryptPasswordHasher, PasswordHasher, PasswordHasherError};
pub use presence::PresenceTracker;
pub use services::{
    ConversationService, ConversationServiceDependencies, MessageService,
    MessageServiceDependencies, NotificationService, NotificationServiceDependencies,
    RegisterUserRequest, SendMessageRequest, UserService, UserServiceDependencies,
};
