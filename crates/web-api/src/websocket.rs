//! WebSocket 处理器
//!
//! 升级前完成 JWT 门禁；连接存活期间由单个任务循环同时处理
//! 下行事件流与客户端上行事件，关闭时回收在线状态。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::session::{ClientEvent, ConnectionSession};
use crate::state::AppState;

/// WebSocket连接查询参数
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    /// JWT access token
    pub token: Option<String>,
}

/// 处理WebSocket连接升级。门禁在升级之前完成：
/// 缺失 token、无效 token、token 指向的用户不存在都以 401 拒绝。
pub async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WebSocketQuery>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing token"))?;

    let user_id = state.jwt_service.verify_token(token)?;
    let user = state
        .user_service
        .get(user_id)
        .await
        .map_err(|_| ApiError::unauthorized("Unknown user"))?
        .public();

    info!(%user_id, "websocket upgrade");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, ConnectionSession::new(user), state)))
}

async fn handle_socket(socket: WebSocket, mut session: ConnectionSession, state: AppState) {
    let user_id = session.user_id();
    info!(%user_id, "websocket connected");

    // 先订阅再标记上线，保证自己的 user:status 不会丢
    let mut events = state.broadcaster.subscribe();
    state.presence.mark_online(user_id).await;

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            envelope = events.recv() => {
                let Some(envelope) = envelope else { break };
                if !session.wants(&envelope.address) {
                    continue;
                }
                match serde_json::to_string(&envelope.event) {
                    Ok(text) => {
                        if sender.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(%user_id, error = %e, "failed to serialize event"),
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        let event = match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                debug!(%user_id, error = %e, "ignoring malformed client event");
                                continue;
                            }
                        };
                        if let Some(reply) = session.handle(event, &state).await {
                            match serde_json::to_string(&reply) {
                                Ok(text) => {
                                    if sender.send(WsMessage::Text(text.into())).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!(%user_id, error = %e, "failed to serialize reply"),
                            }
                        }
                    }
                    // axum 自动应答 ping/pong
                    Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Binary(_))) => {
                        debug!(%user_id, "ignoring binary frame");
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%user_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    state.presence.mark_offline(user_id).await;
    info!(%user_id, "websocket disconnected");
}
