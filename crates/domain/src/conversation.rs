use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ConversationId, MessageId, Timestamp, UserId};

/// 会话实体。
///
/// 非群组会话的参与者恰好两人，且同一对用户只允许存在一个
/// 非群组会话（get-or-create 语义由服务层配合仓储保证）。
/// 群组会话结构上受支持，但不在本核心的深度范围内。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<UserId>,
    pub is_group: bool,
    pub last_message: Option<MessageId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    /// 创建两人直聊会话。
    pub fn new_direct(
        id: ConversationId,
        a: UserId,
        b: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::SelfConversation);
        }
        Ok(Self {
            id,
            participants: vec![a, b],
            is_group: false,
            last_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    /// 推进 last_message 指针。并发发送时后写覆盖先写即可，
    /// 两次写入都对应真实消息。
    pub fn record_last_message(&mut self, message_id: MessageId, now: Timestamp) {
        self.last_message = Some(message_id);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn direct_conversation_rejects_self() {
        let user = UserId::from(Uuid::new_v4());
        let result = Conversation::new_direct(ConversationId::generate(), user, user, Utc::now());
        assert_eq!(result.unwrap_err(), DomainError::SelfConversation);
    }

    #[test]
    fn last_message_pointer_advances() {
        let now = Utc::now();
        let mut conversation = Conversation::new_direct(
            ConversationId::generate(),
            UserId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            now,
        )
        .unwrap();
        assert!(conversation.last_message.is_none());

        let first = MessageId::generate();
        let second = MessageId::generate();
        conversation.record_last_message(first, now);
        conversation.record_last_message(second, now);
        assert_eq!(conversation.last_message, Some(second));
    }
}
