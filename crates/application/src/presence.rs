//! 在线状态追踪。
//!
//! 状态落在用户存储里（跨重启可见），变更后向全局地址广播 `user:status`。
//! 状态广播属于尽力而为：存储或广播失败只记录日志，不影响连接建立/关闭。

use std::sync::Arc;

use tracing::warn;

use domain::{UserId, UserRepository};

use crate::broadcaster::{EventBroadcaster, ServerEvent};
use crate::clock::Clock;

pub struct PresenceTracker {
    user_repository: Arc<dyn UserRepository>,
    broadcaster: Arc<dyn EventBroadcaster>,
    clock: Arc<dyn Clock>,
}

impl PresenceTracker {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        broadcaster: Arc<dyn EventBroadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repository,
            broadcaster,
            clock,
        }
    }

    pub async fn mark_online(&self, user_id: UserId) {
        self.set_presence(user_id, true).await;
    }

    pub async fn mark_offline(&self, user_id: UserId) {
        self.set_presence(user_id, false).await;
    }

    async fn set_presence(&self, user_id: UserId, is_online: bool) {
        let now = self.clock.now();
        if let Err(e) = self
            .user_repository
            .set_presence(user_id, is_online, now)
            .await
        {
            warn!(%user_id, is_online, error = %e, "failed to persist presence");
            return;
        }

        let event = ServerEvent::UserStatus {
            user_id,
            is_online,
            last_seen: now,
        };
        if let Err(e) = self.broadcaster.emit_global(event).await {
            warn!(%user_id, is_online, error = %e, "failed to broadcast presence change");
        }
    }
}
