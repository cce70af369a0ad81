//! 对客户端暴露的视图对象。
//!
//! 与存储模型的区别在于发送者等引用字段已经展开为公开资料，
//! 客户端拿到即可渲染。

use serde::{Deserialize, Serialize};

use domain::{
    Conversation, ConversationId, MediaKind, Message, MessageId, Notification, NotificationId,
    NotificationKind, NotificationSubject, Timestamp, UserPublic,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: UserPublic,
    pub content: String,
    pub media: Option<String>,
    pub media_type: Option<MediaKind>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl MessageView {
    pub fn assemble(message: Message, sender: UserPublic) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender,
            content: message.content,
            media: message.media,
            media_type: message.media_kind,
            is_read: message.is_read,
            read_at: message.read_at,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: ConversationId,
    pub participants: Vec<UserPublic>,
    pub is_group: bool,
    pub last_message: Option<MessageView>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConversationView {
    pub fn assemble(
        conversation: Conversation,
        participants: Vec<UserPublic>,
        last_message: Option<MessageView>,
    ) -> Self {
        Self {
            id: conversation.id,
            participants,
            is_group: conversation.is_group,
            last_message,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<MessageView>,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub total_messages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    pub sender: UserPublic,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(flatten)]
    pub subject: NotificationSubject,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl NotificationView {
    pub fn assemble(notification: Notification, sender: UserPublic) -> Self {
        Self {
            id: notification.id,
            sender,
            kind: notification.kind,
            subject: notification.subject,
            is_read: notification.is_read,
            read_at: notification.read_at,
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<NotificationView>,
    pub unread_count: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub total_notifications: u64,
}
