//! 用例服务。
//!
//! 每个服务通过 `*Dependencies` 结构注入仓储、时钟与广播器；
//! 服务本身不持有连接状态。

mod conversation_service;
mod message_service;
mod notification_service;
mod user_service;

pub use conversation_service::{ConversationService, ConversationServiceDependencies};
pub use message_service::{MessageService, MessageServiceDependencies, SendMessageRequest};
pub use notification_service::{NotificationService, NotificationServiceDependencies};
pub use user_service::{RegisterUserRequest, UserService, UserServiceDependencies};
