use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{
    ConversationView, MessagePage, MessageView, NotificationPage, NotificationView,
    RegisterUserRequest, SendMessageRequest,
};
use domain::{ConversationId, MessageId, NotificationId, UserId};

use crate::auth::LoginResponse;
use crate::error::ApiError;
use crate::state::AppState;
use crate::websocket::websocket_upgrade;

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversationPayload {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCountResponse {
    unread_count: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/conversations", post(create_conversation).get(list_conversations))
        .route("/conversations/{conversation_id}/messages", get(get_messages))
        .route("/messages", post(send_message))
        .route("/messages/{message_id}/read", patch(mark_message_read))
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", patch(mark_all_notifications_read))
        .route("/notifications/{notification_id}/read", patch(mark_notification_read))
        .route("/notifications/{notification_id}", delete(delete_notification))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let user = state.user_service.register(payload).await?;
    let token = state.jwt_service.generate_token(user.id)?;

    Ok((StatusCode::CREATED, Json(LoginResponse { user, token })))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(&payload.email, &payload.password)
        .await?;
    let token = state.jwt_service.generate_token(user.id)?;

    Ok(Json(LoginResponse { user, token }))
}

/// 直聊会话的 get-or-create。
async fn create_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateConversationPayload>,
) -> Result<Json<ConversationView>, ApiError> {
    let requester = state.jwt_service.extract_user_from_headers(&headers)?;
    let view = state
        .conversation_service
        .get_or_create_direct(requester, UserId::from(payload.user_id))
        .await?;

    Ok(Json(view))
}

async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ConversationView>>, ApiError> {
    let requester = state.jwt_service.extract_user_from_headers(&headers)?;
    let views = state.conversation_service.list_for_user(requester).await?;

    Ok(Json(views))
}

async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<MessagePage>, ApiError> {
    let requester = state.jwt_service.extract_user_from_headers(&headers)?;
    let page = state
        .conversation_service
        .get_messages(
            requester,
            ConversationId::from(conversation_id),
            query.page.unwrap_or(1),
            query.limit.unwrap_or(50),
        )
        .await?;

    Ok(Json(page))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    let sender = state.jwt_service.extract_user_from_headers(&headers)?;
    let view = state.message_service.send_message(sender, payload).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn mark_message_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageView>, ApiError> {
    let reader = state.jwt_service.extract_user_from_headers(&headers)?;
    let view = state
        .message_service
        .mark_read(reader, MessageId::from(message_id))
        .await?;

    Ok(Json(view))
}

async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<NotificationPage>, ApiError> {
    let recipient = state.jwt_service.extract_user_from_headers(&headers)?;
    let page = state
        .notification_service
        .list(recipient, query.page.unwrap_or(1), query.limit.unwrap_or(20))
        .await?;

    Ok(Json(page))
}

async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let recipient = state.jwt_service.extract_user_from_headers(&headers)?;
    let unread_count = state.notification_service.unread_count(recipient).await?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationView>, ApiError> {
    let requester = state.jwt_service.extract_user_from_headers(&headers)?;
    let view = state
        .notification_service
        .mark_read(requester, NotificationId::from(notification_id))
        .await?;

    Ok(Json(view))
}

async fn mark_all_notifications_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let requester = state.jwt_service.extract_user_from_headers(&headers)?;
    state.notification_service.mark_all_read(requester).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let requester = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .notification_service
        .delete(requester, NotificationId::from(notification_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
