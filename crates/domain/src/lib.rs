//! 社交网络实时消息核心的领域模型
//!
//! 包含用户、会话、消息、通知等核心实体，以及仓储接口和相关业务规则。

pub mod conversation;
pub mod errors;
pub mod message;
pub mod notification;
pub mod repositories;
pub mod user;
pub mod value_objects;

pub use conversation::Conversation;
pub use errors::{DomainError, RepositoryError};
pub use message::{MediaKind, Message, ReadOutcome};
pub use notification::{Notification, NotificationKind, NotificationSubject, DEDUP_WINDOW_SECS};
pub use repositories::{
    ConversationRepository, MessageRepository, NotificationRepository, RepositoryResult,
    UserRepository,
};
pub use user::{User, UserPublic};
pub use value_objects::{
    ConversationId, MessageId, NotificationId, Timestamp, UserId, Username,
};
