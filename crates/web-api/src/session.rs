//! 连接会话状态。
//!
//! 每个 websocket 连接持有一个会话：认证通过的用户身份加上已加入的
//! 会话房间集合。事件投递时按 `wants` 过滤：全局事件人人可见，
//! 个人房间事件只给本人，会话房间事件只给已加入的连接。

use std::collections::HashSet;

use serde::Deserialize;
use tracing::warn;

use application::{Address, EventBroadcaster, ServerEvent};
use domain::{ConversationId, UserId, UserPublic};

use crate::state::AppState;

/// 客户端上行事件。`event` 字段即线上的事件名。
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "conversation:join")]
    #[serde(rename_all = "camelCase")]
    ConversationJoin { conversation_id: ConversationId },

    #[serde(rename = "conversation:leave")]
    #[serde(rename_all = "camelCase")]
    ConversationLeave { conversation_id: ConversationId },

    #[serde(rename = "typing:start")]
    #[serde(rename_all = "camelCase")]
    TypingStart {
        conversation_id: ConversationId,
        recipient_id: UserId,
    },

    #[serde(rename = "typing:stop")]
    #[serde(rename_all = "camelCase")]
    TypingStop {
        conversation_id: ConversationId,
        recipient_id: UserId,
    },
}

pub struct ConnectionSession {
    user: UserPublic,
    rooms: HashSet<ConversationId>,
}

impl ConnectionSession {
    pub fn new(user: UserPublic) -> Self {
        Self {
            user,
            rooms: HashSet::new(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    /// 本连接是否对该地址上的事件感兴趣。
    pub fn wants(&self, address: &Address) -> bool {
        match address {
            Address::Global => true,
            Address::User(user_id) => *user_id == self.user.id,
            Address::Conversation(conversation_id) => self.rooms.contains(conversation_id),
        }
    }

    /// 处理一条客户端上行事件，返回需要直接回给本连接的回执。
    pub async fn handle(&mut self, event: ClientEvent, state: &AppState) -> Option<ServerEvent> {
        match event {
            ClientEvent::ConversationJoin { conversation_id } => {
                // 只有参与者允许加入房间
                match state
                    .conversation_service
                    .require_participant(self.user.id, conversation_id)
                    .await
                {
                    Ok(_) => {
                        self.rooms.insert(conversation_id);
                        None
                    }
                    Err(e) => Some(ServerEvent::Error {
                        code: "JOIN_REJECTED".into(),
                        message: e.to_string(),
                    }),
                }
            }
            ClientEvent::ConversationLeave { conversation_id } => {
                self.rooms.remove(&conversation_id);
                None
            }
            ClientEvent::TypingStart {
                conversation_id,
                recipient_id,
            } => {
                let event = ServerEvent::TypingStart {
                    conversation_id,
                    user_id: self.user.id,
                    username: self.user.username.clone(),
                };
                self.relay_to_user(state, recipient_id, event).await;
                None
            }
            ClientEvent::TypingStop {
                conversation_id,
                recipient_id,
            } => {
                let event = ServerEvent::TypingStop {
                    conversation_id,
                    user_id: self.user.id,
                };
                self.relay_to_user(state, recipient_id, event).await;
                None
            }
        }
    }

    /// 输入提示是瞬态的，投递失败只记日志。
    async fn relay_to_user(&self, state: &AppState, recipient: UserId, event: ServerEvent) {
        if let Err(e) = state.broadcaster.emit_to_user(recipient, event).await {
            warn!(user_id = %self.user.id, %recipient, error = %e, "failed to relay typing event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::Username;

    fn session() -> ConnectionSession {
        ConnectionSession::new(UserPublic {
            id: UserId::generate(),
            username: Username::parse("alice").unwrap(),
            avatar: None,
            is_online: true,
            last_seen: Utc::now(),
        })
    }

    #[test]
    fn filters_by_address() {
        let mut session = session();
        let own_id = session.user_id();
        let room = ConversationId::generate();

        assert!(session.wants(&Address::Global));
        assert!(session.wants(&Address::User(own_id)));
        assert!(!session.wants(&Address::User(UserId::generate())));

        assert!(!session.wants(&Address::Conversation(room)));
        session.rooms.insert(room);
        assert!(session.wants(&Address::Conversation(room)));
        session.rooms.remove(&room);
        assert!(!session.wants(&Address::Conversation(room)));
    }

    #[test]
    fn client_events_parse_from_wire_names() {
        let conversation_id = ConversationId::generate();
        let recipient_id = UserId::generate();

        let join: ClientEvent = serde_json::from_value(serde_json::json!({
            "event": "conversation:join",
            "data": { "conversationId": conversation_id }
        }))
        .unwrap();
        assert!(matches!(
            join,
            ClientEvent::ConversationJoin { conversation_id: id } if id == conversation_id
        ));

        let typing: ClientEvent = serde_json::from_value(serde_json::json!({
            "event": "typing:start",
            "data": { "conversationId": conversation_id, "recipientId": recipient_id }
        }))
        .unwrap();
        assert!(matches!(
            typing,
            ClientEvent::TypingStart { recipient_id: id, .. } if id == recipient_id
        ));

        // 未知事件名拒绝解析
        assert!(serde_json::from_value::<ClientEvent>(serde_json::json!({
            "event": "unknown:event",
            "data": {}
        }))
        .is_err());
    }
}
