use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Conversation, ConversationId, ConversationRepository, MediaKind, Message, MessageId,
    MessageRepository, Notification, NotificationId, NotificationKind, NotificationRepository,
    NotificationSubject, RepositoryError, RepositoryResult, Timestamp, User, UserId,
    UserRepository,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

pub async fn create_pg_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    avatar: Option<String>,
    password_hash: String,
    is_online: bool,
    last_seen: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username = domain::Username::parse(value.username)
            .map_err(|err| invalid_data(err.to_string()))?;
        Ok(User {
            id: UserId::from(value.id),
            username,
            email: value.email,
            avatar: value.avatar,
            password_hash: value.password_hash,
            is_online: value.is_online,
            last_seen: value.last_seen,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ConversationRecord {
    id: Uuid,
    participants: Vec<Uuid>,
    is_group: bool,
    last_message_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRecord> for Conversation {
    fn from(value: ConversationRecord) -> Self {
        Conversation {
            id: ConversationId::from(value.id),
            participants: value.participants.into_iter().map(UserId::from).collect(),
            is_group: value.is_group,
            last_message: value.last_message_id.map(MessageId::from),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: String,
    media: Option<String>,
    media_kind: Option<MediaKind>, // 直接使用枚举类型
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<MessageRecord> for Message {
    fn from(value: MessageRecord) -> Self {
        Message {
            id: MessageId::from(value.id),
            conversation_id: ConversationId::from(value.conversation_id),
            sender_id: UserId::from(value.sender_id),
            content: value.content,
            media: value.media,
            media_kind: value.media_kind,
            is_read: value.is_read,
            read_at: value.read_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRecord {
    id: Uuid,
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: NotificationKind, // 直接使用枚举类型
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
    story_id: Option<Uuid>,
    message_id: Option<Uuid>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for Notification {
    fn from(value: NotificationRecord) -> Self {
        Notification {
            id: NotificationId::from(value.id),
            recipient: UserId::from(value.recipient_id),
            sender: UserId::from(value.sender_id),
            kind: value.kind,
            subject: NotificationSubject {
                post: value.post_id,
                comment: value.comment_id,
                story: value.story_id,
                message: value.message_id.map(MessageId::from),
            },
            is_read: value.is_read,
            read_at: value.read_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, avatar, password_hash, is_online, last_seen, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, avatar, password_hash, is_online, last_seen, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, username, email, avatar, password_hash, is_online, last_seen, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(&user.password_hash)
        .bind(user.is_online)
        .bind(user.last_seen)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn set_presence(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE users SET is_online = $2, last_seen = $3, updated_at = $3 WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(is_online)
        .bind(last_seen)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CONVERSATION_COLUMNS: &str =
    "id, participants, is_group, last_message_id, created_at, updated_at";

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    async fn create(&self, conversation: Conversation) -> RepositoryResult<Conversation> {
        let participants: Vec<Uuid> = conversation
            .participants
            .iter()
            .copied()
            .map(Uuid::from)
            .collect();
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            INSERT INTO conversations (id, participants, is_group, last_message_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, participants, is_group, last_message_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(conversation.id))
        .bind(&participants)
        .bind(conversation.is_group)
        .bind(conversation.last_message.map(Uuid::from))
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Conversation::from(record))
    }

    async fn find_by_id(&self, id: ConversationId) -> RepositoryResult<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Conversation::from))
    }

    async fn find_direct_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> RepositoryResult<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations
            WHERE NOT is_group
              AND participants @> ARRAY[$1, $2]::uuid[]
              AND cardinality(participants) = 2
            LIMIT 1
            "#
        ))
        .bind(Uuid::from(a))
        .bind(Uuid::from(b))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Conversation::from))
    }

    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Conversation>> {
        let records = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations
            WHERE participants @> ARRAY[$1]::uuid[]
            ORDER BY updated_at DESC
            "#
        ))
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Conversation::from).collect())
    }

    async fn set_last_message(
        &self,
        id: ConversationId,
        message_id: MessageId,
        updated_at: Timestamp,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message_id = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(message_id))
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, content, media, media_kind, is_read, read_at, created_at";

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> RepositoryResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, media, media_kind, is_read, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, conversation_id, sender_id, content, media, media_kind, is_read, read_at, created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.conversation_id))
        .bind(Uuid::from(message.sender_id))
        .bind(&message.content)
        .bind(&message.media)
        .bind(message.media_kind)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Message::from(record))
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Message::from))
    }

    async fn list_page(
        &self,
        conversation_id: ConversationId,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<Vec<Message>> {
        let offset = (page.max(1) as i64 - 1) * limit as i64;
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(Uuid::from(conversation_id))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Message::from).collect())
    }

    async fn count_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> RepositoryResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(Uuid::from(conversation_id))
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }

    async fn mark_read(&self, id: MessageId, read_at: Timestamp) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE, read_at = $2 WHERE id = $1 AND NOT is_read",
        )
        .bind(Uuid::from(id))
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        // 已读是一次性转换，重复更新不算错误
        let _ = result.rows_affected();
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, sender_id, kind, post_id, comment_id, story_id, message_id, is_read, read_at, created_at";

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: Notification) -> RepositoryResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            INSERT INTO notifications (id, recipient_id, sender_id, kind, post_id, comment_id, story_id, message_id, is_read, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, recipient_id, sender_id, kind, post_id, comment_id, story_id, message_id, is_read, read_at, created_at
            "#,
        )
        .bind(Uuid::from(notification.id))
        .bind(Uuid::from(notification.recipient))
        .bind(Uuid::from(notification.sender))
        .bind(notification.kind)
        .bind(notification.subject.post)
        .bind(notification.subject.comment)
        .bind(notification.subject.story)
        .bind(notification.subject.message.map(Uuid::from))
        .bind(notification.is_read)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Notification::from(record))
    }

    async fn find_by_id(&self, id: NotificationId) -> RepositoryResult<Option<Notification>> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Notification::from))
    }

    async fn find_recent_duplicate(
        &self,
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        subject: &NotificationSubject,
        since: Timestamp,
    ) -> RepositoryResult<Option<Notification>> {
        // 去重键不含 story/message 引用
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE recipient_id = $1
              AND sender_id = $2
              AND kind = $3
              AND post_id IS NOT DISTINCT FROM $4
              AND comment_id IS NOT DISTINCT FROM $5
              AND created_at >= $6
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(Uuid::from(recipient))
        .bind(Uuid::from(sender))
        .bind(kind)
        .bind(subject.post)
        .bind(subject.comment)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Notification::from))
    }

    async fn list_for_recipient(
        &self,
        recipient: UserId,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<Vec<Notification>> {
        let offset = (page.max(1) as i64 - 1) * limit as i64;
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(Uuid::from(recipient))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Notification::from).collect())
    }

    async fn count_for_recipient(&self, recipient: UserId) -> RepositoryResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1")
                .bind(Uuid::from(recipient))
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }

    async fn count_unread(&self, recipient: UserId) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(Uuid::from(recipient))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }

    async fn mark_read(&self, id: NotificationId, read_at: Timestamp) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 WHERE id = $1 AND NOT is_read",
        )
        .bind(Uuid::from(id))
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let _ = result.rows_affected();
        Ok(())
    }

    async fn mark_all_read(&self, recipient: UserId, read_at: Timestamp) -> RepositoryResult<()> {
        sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(Uuid::from(recipient))
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn delete(&self, id: NotificationId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
