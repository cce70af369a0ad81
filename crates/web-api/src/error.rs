use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}", field, reason),
            ),
            AppErr::Domain(DomainError::SelfConversation) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "SELF_CONVERSATION",
                "cannot start a conversation with yourself",
            ),
            AppErr::Domain(DomainError::EmptyMessage) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "EMPTY_MESSAGE",
                "message content is required when no media is attached",
            ),
            AppErr::Domain(DomainError::CannotReadOwnMessage) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "CANNOT_READ_OWN_MESSAGE",
                "cannot mark own message as read",
            ),
            AppErr::Domain(DomainError::SelfNotification) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "SELF_NOTIFICATION",
                "self-notifications are suppressed",
            ),
            AppErr::Domain(DomainError::NotParticipant { .. }) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_PARTICIPANT",
                "not a participant of this conversation",
            ),
            AppErr::Domain(DomainError::NotOwner) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_OWNER",
                "not authorized to modify this resource",
            ),
            AppErr::Domain(DomainError::UserNotFound(_)) => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            }
            AppErr::Domain(DomainError::ConversationNotFound(_)) => ApiError::new(
                StatusCode::NOT_FOUND,
                "CONVERSATION_NOT_FOUND",
                "conversation not found",
            ),
            AppErr::Domain(DomainError::MessageNotFound(_)) => ApiError::new(
                StatusCode::NOT_FOUND,
                "MESSAGE_NOT_FOUND",
                "message not found",
            ),
            AppErr::Domain(DomainError::NotificationNotFound(_)) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOTIFICATION_NOT_FOUND",
                "notification not found",
            ),
            AppErr::Domain(DomainError::AlreadyExists { resource }) => ApiError::new(
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
                format!("{} already exists", resource),
            ),
            AppErr::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { message } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("database error: {}", message),
                ),
            },
            AppErr::Password(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PASSWORD_ERROR",
                format!("password error: {}", err),
            ),
            AppErr::Broadcast(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "BROADCAST_ERROR",
                format!("broadcast error: {}", err),
            ),
            AppErr::Authentication(message) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
