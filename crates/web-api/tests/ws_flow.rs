mod support;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use support::{register, spawn_server};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr, token: &str) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{}/api/v1/ws?token={}", addr, token))
        .await
        .expect("ws connect");
    ws
}

/// 读事件直到出现指定事件名，返回其 data；其他事件（在线状态噪声等）被跳过。
async fn next_event(ws: &mut WsStream, name: &str) -> serde_json::Value {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {name}"))
            .expect("stream ended")
            .expect("ws error");
        if let WsMessage::Text(text) = msg {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).expect("json");
            if value["event"] == name {
                return value["data"].clone();
            }
        }
    }
}

/// 读指定用户的下一条 user:status；其他用户的状态变更被跳过。
async fn next_status_for(ws: &mut WsStream, user: Uuid) -> serde_json::Value {
    loop {
        let data = next_event(ws, "user:status").await;
        if data["userId"] == user.to_string() {
            return data;
        }
    }
}

/// 断言在给定时间内不会出现指定事件名。
async fn assert_no_event(ws: &mut WsStream, name: &str, wait: Duration) {
    let result = timeout(wait, async {
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let value: serde_json::Value =
                        serde_json::from_str(text.as_str()).expect("json");
                    if value["event"] == name {
                        return value;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    assert!(result.is_err(), "unexpected {name} event: {:?}", result.ok());
}

async fn send_event(ws: &mut WsStream, event: serde_json::Value) {
    ws.send(WsMessage::Text(event.to_string().into()))
        .await
        .expect("ws send");
}

async fn create_conversation(
    client: &Client,
    addr: SocketAddr,
    token: &str,
    other: Uuid,
) -> Uuid {
    let body = client
        .post(format!("http://{}/api/v1/conversations", addr))
        .bearer_auth(token)
        .json(&json!({ "userId": other }))
        .send()
        .await
        .expect("create conversation")
        .json::<serde_json::Value>()
        .await
        .expect("conversation json");
    body["id"].as_str().expect("id").parse().expect("uuid")
}

#[tokio::test]
async fn gate_rejects_missing_and_invalid_tokens() {
    let (addr, shutdown) = spawn_server().await;

    let missing = connect_async(format!("ws://{}/api/v1/ws", addr)).await;
    assert!(missing.is_err(), "missing token must be rejected");

    let invalid = connect_async(format!("ws://{}/api/v1/ws?token=not-a-jwt", addr)).await;
    assert!(invalid.is_err(), "invalid token must be rejected");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn presence_is_broadcast_on_connect_and_disconnect() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (alice_id, alice_token) = register(&client, addr, "alice").await;
    let (_bob_id, bob_token) = register(&client, addr, "bob").await;

    let mut bob_ws = connect(addr, &bob_token).await;

    let mut alice_ws = connect(addr, &alice_token).await;
    let status = next_status_for(&mut bob_ws, alice_id).await;
    assert_eq!(status["isOnline"], true);

    alice_ws.close(None).await.expect("close alice");
    let status = next_status_for(&mut bob_ws, alice_id).await;
    assert_eq!(status["isOnline"], false);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn messages_reach_joined_participants_only() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (_alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;
    let (_mallory_id, mallory_token) = register(&client, addr, "mallory").await;

    let conversation_id = create_conversation(&client, addr, &alice_token, bob_id).await;

    let mut bob_ws = connect(addr, &bob_token).await;
    let mut mallory_ws = connect(addr, &mallory_token).await;

    send_event(
        &mut bob_ws,
        json!({ "event": "conversation:join", "data": { "conversationId": conversation_id } }),
    )
    .await;

    // 非参与者的加入被拒绝
    send_event(
        &mut mallory_ws,
        json!({ "event": "conversation:join", "data": { "conversationId": conversation_id } }),
    )
    .await;
    let rejection = next_event(&mut mallory_ws, "error").await;
    assert_eq!(rejection["code"], "JOIN_REJECTED");

    let response = client
        .post(format!("http://{}/api/v1/messages", addr))
        .bearer_auth(&alice_token)
        .json(&json!({ "conversationId": conversation_id, "content": "hello bob" }))
        .send()
        .await
        .expect("send message");
    assert_eq!(response.status(), 201);

    let message = next_event(&mut bob_ws, "message:new").await;
    assert_eq!(message["content"], "hello bob");
    assert_eq!(message["conversationId"], conversation_id.to_string());

    // 未加入房间的连接收不到会话事件
    assert_no_event(&mut mallory_ws, "message:new", Duration::from_millis(300)).await;

    let _ = shutdown.send(());
}

#[tokio::test]
async fn typing_indicator_reaches_recipient_only() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (_alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;
    let (_mallory_id, mallory_token) = register(&client, addr, "mallory").await;

    let conversation_id = create_conversation(&client, addr, &alice_token, bob_id).await;

    let mut alice_ws = connect(addr, &alice_token).await;
    let mut bob_ws = connect(addr, &bob_token).await;
    let mut mallory_ws = connect(addr, &mallory_token).await;

    send_event(
        &mut alice_ws,
        json!({
            "event": "typing:start",
            "data": { "conversationId": conversation_id, "recipientId": bob_id }
        }),
    )
    .await;

    let typing = next_event(&mut bob_ws, "typing:start").await;
    assert_eq!(typing["conversationId"], conversation_id.to_string());
    assert_eq!(typing["username"], "alice");

    assert_no_event(&mut mallory_ws, "typing:start", Duration::from_millis(300)).await;

    send_event(
        &mut alice_ws,
        json!({
            "event": "typing:stop",
            "data": { "conversationId": conversation_id, "recipientId": bob_id }
        }),
    )
    .await;
    let stopped = next_event(&mut bob_ws, "typing:stop").await;
    assert_eq!(stopped["conversationId"], conversation_id.to_string());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn notification_is_pushed_to_recipient_connection() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (_alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;

    let conversation_id = create_conversation(&client, addr, &alice_token, bob_id).await;
    let mut bob_ws = connect(addr, &bob_token).await;

    client
        .post(format!("http://{}/api/v1/messages", addr))
        .bearer_auth(&alice_token)
        .json(&json!({ "conversationId": conversation_id, "content": "ping" }))
        .send()
        .await
        .expect("send message");

    let notification = next_event(&mut bob_ws, "notification:new").await;
    assert_eq!(notification["type"], "message");
    assert_eq!(notification["sender"]["username"], "alice");

    let _ = shutdown.send(());
}
