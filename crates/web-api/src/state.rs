use std::sync::Arc;

use application::{
    ConversationService, MessageService, NotificationService, PresenceTracker, UserService,
};
use infrastructure::LocalEventBroadcaster;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub conversation_service: Arc<ConversationService>,
    pub message_service: Arc<MessageService>,
    pub notification_service: Arc<NotificationService>,
    pub presence: Arc<PresenceTracker>,
    pub broadcaster: Arc<LocalEventBroadcaster>,
    pub jwt_service: Arc<JwtService>,
}
