use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{MessageId, NotificationId, Timestamp, UserId};

/// 去重窗口：窗口内相同 (recipient, sender, kind, post, comment)
/// 的通知折叠为一条。
pub const DEDUP_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    Message,
    StoryView,
}

/// 通知可引用的主体实体。帖子/评论/故事本身不属于本核心，
/// 这里只保留不透明的标识。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSubject {
    pub post: Option<uuid::Uuid>,
    pub comment: Option<uuid::Uuid>,
    pub story: Option<uuid::Uuid>,
    pub message: Option<MessageId>,
}

impl NotificationSubject {
    pub fn message(message_id: MessageId) -> Self {
        Self {
            message: Some(message_id),
            ..Self::default()
        }
    }

    pub fn post(post_id: uuid::Uuid) -> Self {
        Self {
            post: Some(post_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub sender: UserId,
    pub kind: NotificationKind,
    #[serde(flatten)]
    pub subject: NotificationSubject,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Notification {
    /// 创建通知；自我通知被抑制而不是入库。
    pub fn new(
        id: NotificationId,
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        subject: NotificationSubject,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if recipient == sender {
            return Err(DomainError::SelfNotification);
        }
        Ok(Self {
            id,
            recipient,
            sender,
            kind,
            subject,
            is_read: false,
            read_at: None,
            created_at: now,
        })
    }

    /// 幂等的已读标记。
    pub fn mark_read(&mut self, now: Timestamp) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(now);
        }
    }

    /// 去重键匹配：story/message 引用不参与比较，与参考行为一致。
    pub fn duplicates(
        &self,
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        subject: &NotificationSubject,
    ) -> bool {
        self.recipient == recipient
            && self.sender == sender
            && self.kind == kind
            && self.subject.post == subject.post
            && self.subject.comment == subject.comment
    }
}
