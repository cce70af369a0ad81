//! 通知扇出与通知收件箱。
//!
//! 扇出路径（notify_*）是尽力而为的：自我通知与去重窗口内的重复
//! 被静默折叠，存储或广播故障记日志后吞掉，绝不影响触发它的主操作。
//! 收件箱操作（列表、已读、删除）是普通的请求/响应路径，错误正常上抛。

use std::sync::Arc;

use chrono::Duration;
use tracing::warn;

use domain::{
    DomainError, MessageId, Notification, NotificationId, NotificationKind,
    NotificationRepository, NotificationSubject, UserId, UserRepository, DEDUP_WINDOW_SECS,
};

use crate::broadcaster::{EventBroadcaster, ServerEvent};
use crate::clock::Clock;
use crate::dto::{NotificationPage, NotificationView};
use crate::error::ApplicationError;

pub struct NotificationServiceDependencies {
    pub notification_repository: Arc<dyn NotificationRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub struct NotificationService {
    notification_repository: Arc<dyn NotificationRepository>,
    user_repository: Arc<dyn UserRepository>,
    broadcaster: Arc<dyn EventBroadcaster>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(deps: NotificationServiceDependencies) -> Self {
        Self {
            notification_repository: deps.notification_repository,
            user_repository: deps.user_repository,
            broadcaster: deps.broadcaster,
            clock: deps.clock,
        }
    }

    pub async fn notify_follow(&self, recipient: UserId, sender: UserId) -> Option<NotificationView> {
        self.notify(recipient, sender, NotificationKind::Follow, NotificationSubject::default())
            .await
    }

    pub async fn notify_like(
        &self,
        recipient: UserId,
        sender: UserId,
        post: uuid::Uuid,
    ) -> Option<NotificationView> {
        self.notify(recipient, sender, NotificationKind::Like, NotificationSubject::post(post))
            .await
    }

    pub async fn notify_comment(
        &self,
        recipient: UserId,
        sender: UserId,
        post: uuid::Uuid,
        comment: uuid::Uuid,
    ) -> Option<NotificationView> {
        let subject = NotificationSubject {
            post: Some(post),
            comment: Some(comment),
            ..NotificationSubject::default()
        };
        self.notify(recipient, sender, NotificationKind::Comment, subject)
            .await
    }

    pub async fn notify_message(
        &self,
        recipient: UserId,
        sender: UserId,
        message_id: MessageId,
    ) -> Option<NotificationView> {
        self.notify(
            recipient,
            sender,
            NotificationKind::Message,
            NotificationSubject::message(message_id),
        )
        .await
    }

    pub async fn notify_story_view(
        &self,
        recipient: UserId,
        sender: UserId,
        story: uuid::Uuid,
    ) -> Option<NotificationView> {
        let subject = NotificationSubject {
            story: Some(story),
            ..NotificationSubject::default()
        };
        self.notify(recipient, sender, NotificationKind::StoryView, subject)
            .await
    }

    /// 扇出入口。返回 None 表示通知被抑制（自我通知、窗口内重复）
    /// 或者创建失败。
    pub async fn notify(
        &self,
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        subject: NotificationSubject,
    ) -> Option<NotificationView> {
        match self.create(recipient, sender, kind, subject).await {
            Ok(view) => view,
            Err(e) => {
                warn!(%recipient, %sender, error = %e, "failed to create notification");
                None
            }
        }
    }

    async fn create(
        &self,
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        subject: NotificationSubject,
    ) -> Result<Option<NotificationView>, ApplicationError> {
        // 自我通知被静默抑制
        if recipient == sender {
            return Ok(None);
        }

        let now = self.clock.now();
        let since = now - Duration::seconds(DEDUP_WINDOW_SECS);
        if self
            .notification_repository
            .find_recent_duplicate(recipient, sender, kind, &subject, since)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let notification = Notification::new(
            NotificationId::generate(),
            recipient,
            sender,
            kind,
            subject,
            now,
        )?;
        let notification = self.notification_repository.create(notification).await?;

        let sender_profile = self
            .user_repository
            .find_by_id(sender)
            .await?
            .ok_or(DomainError::UserNotFound(sender))?
            .public();
        let view = NotificationView::assemble(notification, sender_profile);

        if let Err(e) = self
            .broadcaster
            .emit_to_user(recipient, ServerEvent::NotificationNew(view.clone()))
            .await
        {
            warn!(%recipient, error = %e, "failed to push notification");
        }

        Ok(Some(view))
    }

    /// 收件箱列表，按创建时间降序分页。
    pub async fn list(
        &self,
        recipient: UserId,
        page: u32,
        limit: u32,
    ) -> Result<NotificationPage, ApplicationError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let notifications = self
            .notification_repository
            .list_for_recipient(recipient, page, limit)
            .await?;
        let total = self
            .notification_repository
            .count_for_recipient(recipient)
            .await?;
        let unread_count = self.notification_repository.count_unread(recipient).await?;

        let mut views = Vec::with_capacity(notifications.len());
        for notification in notifications {
            let sender = self
                .user_repository
                .find_by_id(notification.sender)
                .await?
                .ok_or(DomainError::UserNotFound(notification.sender))?
                .public();
            views.push(NotificationView::assemble(notification, sender));
        }

        Ok(NotificationPage {
            notifications: views,
            unread_count,
            page,
            limit,
            total_pages: total.div_ceil(limit as u64) as u32,
            total_notifications: total,
        })
    }

    pub async fn unread_count(&self, recipient: UserId) -> Result<u64, ApplicationError> {
        Ok(self.notification_repository.count_unread(recipient).await?)
    }

    pub async fn mark_read(
        &self,
        requester: UserId,
        id: NotificationId,
    ) -> Result<NotificationView, ApplicationError> {
        let mut notification = self.require_owned(requester, id).await?;

        let now = self.clock.now();
        if !notification.is_read {
            self.notification_repository.mark_read(id, now).await?;
        }
        notification.mark_read(now);

        let sender = self
            .user_repository
            .find_by_id(notification.sender)
            .await?
            .ok_or(DomainError::UserNotFound(notification.sender))?
            .public();
        Ok(NotificationView::assemble(notification, sender))
    }

    pub async fn mark_all_read(&self, recipient: UserId) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        Ok(self
            .notification_repository
            .mark_all_read(recipient, now)
            .await?)
    }

    pub async fn delete(
        &self,
        requester: UserId,
        id: NotificationId,
    ) -> Result<(), ApplicationError> {
        self.require_owned(requester, id).await?;
        Ok(self.notification_repository.delete(id).await?)
    }

    async fn require_owned(
        &self,
        requester: UserId,
        id: NotificationId,
    ) -> Result<Notification, ApplicationError> {
        let notification = self
            .notification_repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotificationNotFound(id))?;
        if notification.recipient != requester {
            return Err(DomainError::NotOwner.into());
        }
        Ok(notification)
    }
}
