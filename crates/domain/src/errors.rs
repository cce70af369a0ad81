//! 领域错误定义
//!
//! 错误分类与对外的故障语义对应：BadRequest / NotFound / Forbidden，
//! 由 web 层统一映射为 HTTP 状态码。

use thiserror::Error;

use crate::value_objects::{ConversationId, MessageId, NotificationId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 字段校验失败 (BadRequest)
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 不能与自己建立会话 (BadRequest)
    #[error("cannot create conversation with yourself")]
    SelfConversation,

    /// 消息内容为空且没有媒体附件 (BadRequest)
    #[error("message content is required when no media is attached")]
    EmptyMessage,

    /// 发送者不能把自己的消息标记为已读 (BadRequest)
    #[error("cannot mark own message as read")]
    CannotReadOwnMessage,

    /// 通知的接收者不能是发送者自己
    #[error("self-notifications are suppressed")]
    SelfNotification,

    /// 用户不是会话参与者 (Forbidden)
    #[error("user {user_id} is not a participant of conversation {conversation_id}")]
    NotParticipant {
        user_id: UserId,
        conversation_id: ConversationId,
    },

    /// 资源归属校验失败 (Forbidden)
    #[error("not authorized to modify this resource")]
    NotOwner,

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    #[error("notification {0} not found")]
    NotificationNotFound(NotificationId),

    /// 唯一约束冲突，例如邮箱已注册
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
        }
    }
}

/// 仓储层错误，持久化细节在这里被抹平。
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("conflict with existing record")]
    Conflict,

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
