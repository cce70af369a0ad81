//! 会话管理：get-or-create 直聊、会话列表、历史分页。

use std::sync::Arc;

use domain::{
    Conversation, ConversationId, ConversationRepository, DomainError, Message, MessageRepository,
    UserId, UserPublic, UserRepository,
};

use crate::clock::Clock;
use crate::dto::{ConversationView, MessagePage, MessageView};
use crate::error::ApplicationError;

pub struct ConversationServiceDependencies {
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ConversationService {
    conversation_repository: Arc<dyn ConversationRepository>,
    message_repository: Arc<dyn MessageRepository>,
    user_repository: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl ConversationService {
    pub fn new(deps: ConversationServiceDependencies) -> Self {
        Self {
            conversation_repository: deps.conversation_repository,
            message_repository: deps.message_repository,
            user_repository: deps.user_repository,
            clock: deps.clock,
        }
    }

    /// 直聊会话的 get-or-create。同一对用户重复调用返回同一个会话。
    pub async fn get_or_create_direct(
        &self,
        requester: UserId,
        other: UserId,
    ) -> Result<ConversationView, ApplicationError> {
        if requester == other {
            return Err(DomainError::SelfConversation.into());
        }
        if self.user_repository.find_by_id(other).await?.is_none() {
            return Err(DomainError::UserNotFound(other).into());
        }

        let conversation = match self
            .conversation_repository
            .find_direct_between(requester, other)
            .await?
        {
            Some(existing) => existing,
            None => {
                let conversation = Conversation::new_direct(
                    ConversationId::generate(),
                    requester,
                    other,
                    self.clock.now(),
                )?;
                self.conversation_repository.create(conversation).await?
            }
        };

        self.assemble_view(conversation).await
    }

    /// 当前用户参与的所有会话，按最近活动降序。
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationView>, ApplicationError> {
        let conversations = self.conversation_repository.list_for_user(user_id).await?;
        let mut views = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            views.push(self.assemble_view(conversation).await?);
        }
        Ok(views)
    }

    /// 会话历史，按创建时间升序分页。非参与者被拒绝。
    pub async fn get_messages(
        &self,
        requester: UserId,
        conversation_id: ConversationId,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage, ApplicationError> {
        let conversation = self.require_participant(requester, conversation_id).await?;

        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let messages = self
            .message_repository
            .list_page(conversation.id, page, limit)
            .await?;
        let total = self
            .message_repository
            .count_for_conversation(conversation.id)
            .await?;

        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            views.push(self.assemble_message(message).await?);
        }

        Ok(MessagePage {
            messages: views,
            page,
            limit,
            total_pages: total.div_ceil(limit as u64) as u32,
            total_messages: total,
        })
    }

    pub async fn require_participant(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<Conversation, ApplicationError> {
        let conversation = self
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound(conversation_id))?;
        if !conversation.is_participant(user_id) {
            return Err(DomainError::NotParticipant {
                user_id,
                conversation_id,
            }
            .into());
        }
        Ok(conversation)
    }

    async fn assemble_view(
        &self,
        conversation: Conversation,
    ) -> Result<ConversationView, ApplicationError> {
        let mut participants = Vec::with_capacity(conversation.participants.len());
        for user_id in &conversation.participants {
            participants.push(self.public_profile(*user_id).await?);
        }

        let last_message = match conversation.last_message {
            Some(message_id) => match self.message_repository.find_by_id(message_id).await? {
                Some(message) => Some(self.assemble_message(message).await?),
                None => None,
            },
            None => None,
        };

        Ok(ConversationView::assemble(
            conversation,
            participants,
            last_message,
        ))
    }

    async fn assemble_message(&self, message: Message) -> Result<MessageView, ApplicationError> {
        let sender = self.public_profile(message.sender_id).await?;
        Ok(MessageView::assemble(message, sender))
    }

    async fn public_profile(&self, user_id: UserId) -> Result<UserPublic, ApplicationError> {
        Ok(self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?
            .public())
    }
}
