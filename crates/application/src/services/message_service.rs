//! 消息投递管道与已读回执。
//!
//! 投递顺序：校验前置条件 → 落库 → 推进会话 last_message →
//! 向会话房间广播 → 给其余参与者扇出通知。落库成功后，
//! 广播和通知都是尽力而为，失败只记录日志。

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use domain::{
    ConversationId, ConversationRepository, DomainError, MediaKind, Message, MessageId,
    MessageRepository, ReadOutcome, UserId, UserRepository,
};

use crate::broadcaster::{EventBroadcaster, ServerEvent};
use crate::clock::Clock;
use crate::dto::MessageView;
use crate::error::ApplicationError;
use crate::services::notification_service::NotificationService;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub content: String,
    /// 已上传媒体的引用（上传本身由文件服务负责）。
    pub media: Option<String>,
    /// 媒体的 MIME 类型，用于推断附件分类。
    pub media_type: Option<String>,
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub notification_service: Arc<NotificationService>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    message_repository: Arc<dyn MessageRepository>,
    conversation_repository: Arc<dyn ConversationRepository>,
    user_repository: Arc<dyn UserRepository>,
    notification_service: Arc<NotificationService>,
    broadcaster: Arc<dyn EventBroadcaster>,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self {
            message_repository: deps.message_repository,
            conversation_repository: deps.conversation_repository,
            user_repository: deps.user_repository,
            notification_service: deps.notification_service,
            broadcaster: deps.broadcaster,
            clock: deps.clock,
        }
    }

    pub async fn send_message(
        &self,
        sender_id: UserId,
        request: SendMessageRequest,
    ) -> Result<MessageView, ApplicationError> {
        let conversation_id = request
            .conversation_id
            .ok_or_else(|| DomainError::invalid_argument("conversationId", "is required"))?;

        let conversation = self
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound(conversation_id))?;
        if !conversation.is_participant(sender_id) {
            return Err(DomainError::NotParticipant {
                user_id: sender_id,
                conversation_id,
            }
            .into());
        }

        let now = self.clock.now();
        let media_kind = request
            .media
            .as_deref()
            .map(|_| MediaKind::from_mime(request.media_type.as_deref().unwrap_or("")));
        let message = Message::new(
            MessageId::generate(),
            conversation_id,
            sender_id,
            request.content,
            request.media,
            media_kind,
            now,
        )?;

        let message = self.message_repository.create(message).await?;
        self.conversation_repository
            .set_last_message(conversation_id, message.id, now)
            .await?;

        let sender = self
            .user_repository
            .find_by_id(sender_id)
            .await?
            .ok_or(DomainError::UserNotFound(sender_id))?
            .public();
        let view = MessageView::assemble(message, sender);

        // 消息已经持久化，广播失败不回滚投递。
        if let Err(e) = self
            .broadcaster
            .emit_to_conversation(conversation_id, ServerEvent::MessageNew(view.clone()))
            .await
        {
            warn!(%conversation_id, error = %e, "failed to broadcast new message");
        }

        for participant in conversation.participants {
            if participant != sender_id {
                self.notification_service
                    .notify_message(participant, sender_id, view.id)
                    .await;
            }
        }

        Ok(view)
    }

    /// 已读回执。重复标记是幂等的成功，只有首次转换才广播 `message:read`。
    pub async fn mark_read(
        &self,
        reader_id: UserId,
        message_id: MessageId,
    ) -> Result<MessageView, ApplicationError> {
        let mut message = self
            .message_repository
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;

        let conversation = self
            .conversation_repository
            .find_by_id(message.conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound(message.conversation_id))?;
        if !conversation.is_participant(reader_id) {
            return Err(DomainError::NotParticipant {
                user_id: reader_id,
                conversation_id: conversation.id,
            }
            .into());
        }

        let now = self.clock.now();
        let outcome = message.mark_read_by(reader_id, now)?;
        if outcome == ReadOutcome::Marked {
            self.message_repository.mark_read(message.id, now).await?;
            let event = ServerEvent::MessageRead {
                message_id: message.id,
                user_id: reader_id,
                read_at: now,
            };
            if let Err(e) = self
                .broadcaster
                .emit_to_conversation(conversation.id, event)
                .await
            {
                warn!(%message_id, error = %e, "failed to broadcast read receipt");
            }
        }

        let sender = self
            .user_repository
            .find_by_id(message.sender_id)
            .await?
            .ok_or(DomainError::UserNotFound(message.sender_id))?
            .public();
        Ok(MessageView::assemble(message, sender))
    }
}
