//! 事件广播抽象
//!
//! 取代"全局 socket 单例"的模式：广播器作为显式依赖注入到各管道，
//! 在传输层接线之前使用会以 `NotInitialized` 立即失败，
//! 而不是在处理器深处抛出。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use domain::{ConversationId, MessageId, Timestamp, UserId, Username};

use crate::dto::{MessageView, NotificationView};

/// 逻辑投递地址。个人房间承载定向投递（通知、输入提示），
/// 会话房间承载群发，全局地址承载在线状态变更。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Global,
    User(UserId),
    Conversation(ConversationId),
}

/// 服务端推送事件。`event` 字段即线上的事件名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew(MessageView),

    #[serde(rename = "message:read")]
    #[serde(rename_all = "camelCase")]
    MessageRead {
        message_id: MessageId,
        user_id: UserId,
        read_at: Timestamp,
    },

    #[serde(rename = "typing:start")]
    #[serde(rename_all = "camelCase")]
    TypingStart {
        conversation_id: ConversationId,
        user_id: UserId,
        username: Username,
    },

    #[serde(rename = "typing:stop")]
    #[serde(rename_all = "camelCase")]
    TypingStop {
        conversation_id: ConversationId,
        user_id: UserId,
    },

    #[serde(rename = "user:status")]
    #[serde(rename_all = "camelCase")]
    UserStatus {
        user_id: UserId,
        is_online: bool,
        last_seen: Timestamp,
    },

    #[serde(rename = "notification:new")]
    NotificationNew(NotificationView),

    /// 服务端拒绝某个客户端请求时的回执（例如未授权的房间加入）。
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub address: Address,
    pub event: ServerEvent,
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    /// 传输层尚未接线。
    #[error("event transport not initialized")]
    NotInitialized,

    #[error("broadcast channel closed: {0}")]
    Closed(String),
}

#[async_trait]
pub trait EventBroadcaster: Send + Sync {
    async fn emit(&self, envelope: EventEnvelope) -> Result<(), BroadcastError>;

    async fn emit_to_user(&self, user_id: UserId, event: ServerEvent) -> Result<(), BroadcastError> {
        self.emit(EventEnvelope {
            address: Address::User(user_id),
            event,
        })
        .await
    }

    async fn emit_to_conversation(
        &self,
        conversation_id: ConversationId,
        event: ServerEvent,
    ) -> Result<(), BroadcastError> {
        self.emit(EventEnvelope {
            address: Address::Conversation(conversation_id),
            event,
        })
        .await
    }

    async fn emit_global(&self, event: ServerEvent) -> Result<(), BroadcastError> {
        self.emit(EventEnvelope {
            address: Address::Global,
            event,
        })
        .await
    }
}

/// 占位广播器：在真正的传输层接好之前充当依赖，任何使用都会失败。
#[derive(Debug, Default)]
pub struct UnwiredBroadcaster;

#[async_trait]
impl EventBroadcaster for UnwiredBroadcaster {
    async fn emit(&self, _envelope: EventEnvelope) -> Result<(), BroadcastError> {
        Err(BroadcastError::NotInitialized)
    }
}

/// 录制广播器，测试用：记录所有经过的信封。
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    events: std::sync::Mutex<Vec<EventEnvelope>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().expect("recording lock poisoned").clone()
    }

    pub fn events_for(&self, address: Address) -> Vec<ServerEvent> {
        self.events()
            .into_iter()
            .filter(|envelope| envelope.address == address)
            .map(|envelope| envelope.event)
            .collect()
    }
}

#[async_trait]
impl EventBroadcaster for RecordingBroadcaster {
    async fn emit(&self, envelope: EventEnvelope) -> Result<(), BroadcastError> {
        self.events
            .lock()
            .expect("recording lock poisoned")
            .push(envelope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn server_events_use_wire_names() {
        let event = ServerEvent::UserStatus {
            user_id: UserId::from(Uuid::new_v4()),
            is_online: true,
            last_seen: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "user:status");
        assert_eq!(json["data"]["isOnline"], true);
        assert!(json["data"]["userId"].is_string());
    }

    #[tokio::test]
    async fn unwired_broadcaster_fails_loudly() {
        let broadcaster = UnwiredBroadcaster;
        let result = broadcaster
            .emit_global(ServerEvent::Error {
                code: "TEST".into(),
                message: "test".into(),
            })
            .await;
        assert!(matches!(result, Err(BroadcastError::NotInitialized)));
    }
}
