//! 进程内事件广播。
//!
//! 所有服务端事件汇入同一条 broadcast 通道，每个 websocket 连接
//! 订阅后按自己的房间成员关系过滤。路由判断留在连接侧，
//! 通道本身只负责扇出。

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use application::{BroadcastError, EventBroadcaster, EventEnvelope};

pub struct LocalEventBroadcaster {
    sender: broadcast::Sender<EventEnvelope>,
}

impl LocalEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

#[async_trait]
impl EventBroadcaster for LocalEventBroadcaster {
    async fn emit(&self, envelope: EventEnvelope) -> Result<(), BroadcastError> {
        // 没有在线连接时 send 返回错误；事件本就只面向在线客户端，丢弃即可
        let _ = self.sender.send(envelope);
        Ok(())
    }
}

pub struct EventStream {
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl EventStream {
    /// 下一个事件。慢消费者丢失的事件被跳过而不是中断连接。
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::{Address, ServerEvent};
    use domain::UserId;

    fn status_event() -> ServerEvent {
        ServerEvent::UserStatus {
            user_id: UserId::generate(),
            is_online: true,
            last_seen: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_not_an_error() {
        let broadcaster = LocalEventBroadcaster::new(16);
        let result = broadcaster.emit_global(status_event()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_envelope() {
        let broadcaster = LocalEventBroadcaster::new(16);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        broadcaster.emit_global(status_event()).await.unwrap();

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert_eq!(a.address, Address::Global);
        assert_eq!(b.address, Address::Global);
    }
}
