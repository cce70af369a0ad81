//! 仓储接口
//!
//! 存储是唯一共享可变资源；每个方法对应一次原子的存储操作，
//! 不依赖多步事务（见并发模型）。

use async_trait::async_trait;

use crate::conversation::Conversation;
use crate::errors::RepositoryError;
use crate::message::Message;
use crate::notification::{Notification, NotificationKind, NotificationSubject};
use crate::user::User;
use crate::value_objects::{
    ConversationId, MessageId, NotificationId, Timestamp, UserId,
};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    /// 单行更新在线标志与 last_seen；必须落库以跨重连存活。
    async fn set_presence(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> RepositoryResult<()>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create(&self, conversation: Conversation) -> RepositoryResult<Conversation>;
    async fn find_by_id(&self, id: ConversationId) -> RepositoryResult<Option<Conversation>>;
    /// 查找两名用户之间的非群组会话（无序对唯一）。
    async fn find_direct_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> RepositoryResult<Option<Conversation>>;
    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Conversation>>;
    /// 推进 last_message 指针，单行更新，后写覆盖先写。
    async fn set_last_message(
        &self,
        id: ConversationId,
        message_id: MessageId,
        updated_at: Timestamp,
    ) -> RepositoryResult<()>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> RepositoryResult<Message>;
    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>>;
    /// 按创建时间升序分页。page 从 1 开始。
    async fn list_page(
        &self,
        conversation_id: ConversationId,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<Vec<Message>>;
    async fn count_for_conversation(&self, conversation_id: ConversationId)
        -> RepositoryResult<u64>;
    async fn mark_read(&self, id: MessageId, read_at: Timestamp) -> RepositoryResult<()>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> RepositoryResult<Notification>;
    async fn find_by_id(&self, id: NotificationId) -> RepositoryResult<Option<Notification>>;
    /// 去重查询：since 之后创建的、去重键相同的最近一条通知。
    async fn find_recent_duplicate(
        &self,
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        subject: &NotificationSubject,
        since: Timestamp,
    ) -> RepositoryResult<Option<Notification>>;
    /// 按创建时间降序分页。
    async fn list_for_recipient(
        &self,
        recipient: UserId,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<Vec<Notification>>;
    async fn count_for_recipient(&self, recipient: UserId) -> RepositoryResult<u64>;
    async fn count_unread(&self, recipient: UserId) -> RepositoryResult<u64>;
    async fn mark_read(&self, id: NotificationId, read_at: Timestamp) -> RepositoryResult<()>;
    async fn mark_all_read(&self, recipient: UserId, read_at: Timestamp) -> RepositoryResult<()>;
    async fn delete(&self, id: NotificationId) -> RepositoryResult<()>;
}
