//! 内存仓储实现。
//!
//! 服务层单元测试与 web-api 集成测试共用，语义与 Postgres 实现一致：
//! 每个方法是一次原子操作，排序/分页规则与 SQL 版本对齐。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use domain::{
    Conversation, ConversationId, ConversationRepository, Message, MessageId, MessageRepository,
    Notification, NotificationId, NotificationKind, NotificationRepository, NotificationSubject,
    RepositoryError, RepositoryResult, Timestamp, User, UserId, UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_presence(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> RepositoryResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.is_online = is_online;
        user.last_seen = last_seen;
        user.updated_at = last_seen;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(&self, conversation: Conversation) -> RepositoryResult<Conversation> {
        self.conversations
            .write()
            .await
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_by_id(&self, id: ConversationId) -> RepositoryResult<Option<Conversation>> {
        Ok(self.conversations.read().await.get(&id).cloned())
    }

    async fn find_direct_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> RepositoryResult<Option<Conversation>> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .find(|c| {
                !c.is_group
                    && c.participants.len() == 2
                    && c.participants.contains(&a)
                    && c.participants.contains(&b)
            })
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Conversation>> {
        let mut found: Vec<Conversation> = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.participants.contains(&user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found)
    }

    async fn set_last_message(
        &self,
        id: ConversationId,
        message_id: MessageId,
        updated_at: Timestamp,
    ) -> RepositoryResult<()> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        conversation.last_message = Some(message_id);
        conversation.updated_at = updated_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<HashMap<MessageId, Message>>,
    // 会话内的插入顺序索引，保证分页稳定。
    order: RwLock<HashMap<ConversationId, Vec<MessageId>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: Message) -> RepositoryResult<Message> {
        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        self.order
            .write()
            .await
            .entry(message.conversation_id)
            .or_default()
            .push(message.id);
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn list_page(
        &self,
        conversation_id: ConversationId,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<Vec<Message>> {
        let order = self.order.read().await;
        let ids = match order.get(&conversation_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        let offset = (page.max(1) as usize - 1) * limit as usize;
        let messages = self.messages.read().await;
        Ok(ids
            .iter()
            .skip(offset)
            .take(limit as usize)
            .filter_map(|id| messages.get(id).cloned())
            .collect())
    }

    async fn count_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> RepositoryResult<u64> {
        Ok(self
            .order
            .read()
            .await
            .get(&conversation_id)
            .map_or(0, |ids| ids.len() as u64))
    }

    async fn mark_read(&self, id: MessageId, read_at: Timestamp) -> RepositoryResult<()> {
        let mut messages = self.messages.write().await;
        let message = messages.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        message.is_read = true;
        message.read_at = Some(read_at);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<HashMap<NotificationId, Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: Notification) -> RepositoryResult<Notification> {
        self.notifications
            .write()
            .await
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: NotificationId) -> RepositoryResult<Option<Notification>> {
        Ok(self.notifications.read().await.get(&id).cloned())
    }

    async fn find_recent_duplicate(
        &self,
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        subject: &NotificationSubject,
        since: Timestamp,
    ) -> RepositoryResult<Option<Notification>> {
        Ok(self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| {
                n.recipient == recipient
                    && n.sender == sender
                    && n.kind == kind
                    && n.subject.post == subject.post
                    && n.subject.comment == subject.comment
                    && n.created_at >= since
            })
            .max_by_key(|n| n.created_at)
            .cloned())
    }

    async fn list_for_recipient(
        &self,
        recipient: UserId,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<Vec<Notification>> {
        let mut found: Vec<Notification> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = (page.max(1) as usize - 1) * limit as usize;
        Ok(found
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect())
    }

    async fn count_for_recipient(&self, recipient: UserId) -> RepositoryResult<u64> {
        Ok(self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.recipient == recipient)
            .count() as u64)
    }

    async fn count_unread(&self, recipient: UserId) -> RepositoryResult<u64> {
        Ok(self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.recipient == recipient && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, id: NotificationId, read_at: Timestamp) -> RepositoryResult<()> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        notification.is_read = true;
        notification.read_at = Some(read_at);
        Ok(())
    }

    async fn mark_all_read(&self, recipient: UserId, read_at: Timestamp) -> RepositoryResult<()> {
        let mut notifications = self.notifications.write().await;
        for notification in notifications.values_mut() {
            if notification.recipient == recipient && !notification.is_read {
                notification.is_read = true;
                notification.read_at = Some(read_at);
            }
        }
        Ok(())
    }

    async fn delete(&self, id: NotificationId) -> RepositoryResult<()> {
        self.notifications
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}
