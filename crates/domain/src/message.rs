use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ConversationId, MessageId, Timestamp, UserId};

/// 媒体附件分类，按 MIME 前缀推断。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "media_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else {
            Self::File
        }
    }
}

/// 标记已读的结果，用于区分首次标记和幂等的重复调用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Marked,
    AlreadyRead,
}

/// 消息实体。
///
/// 消息创建后唯一允许的变更是已读状态的 false→true 一次性转换。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub media: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        media: Option<String>,
        media_kind: Option<MediaKind>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        // 仅有媒体附件时允许正文为空
        if content.trim().is_empty() && media.is_none() {
            return Err(DomainError::EmptyMessage);
        }
        Ok(Self {
            id,
            conversation_id,
            sender_id,
            content,
            media,
            media_kind,
            is_read: false,
            read_at: None,
            created_at,
        })
    }

    /// 已读状态转换。发送者不可标记自己的消息；重复标记是无副作用的
    /// 成功（幂等），read_at 只被设置一次。
    pub fn mark_read_by(
        &mut self,
        reader_id: UserId,
        now: Timestamp,
    ) -> Result<ReadOutcome, DomainError> {
        if reader_id == self.sender_id {
            return Err(DomainError::CannotReadOwnMessage);
        }
        if self.is_read {
            return Ok(ReadOutcome::AlreadyRead);
        }
        self.is_read = true;
        self.read_at = Some(now);
        Ok(ReadOutcome::Marked)
    }
}
