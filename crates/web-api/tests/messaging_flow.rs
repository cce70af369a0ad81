mod support;

use std::net::SocketAddr;

use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use support::{register, spawn_server};

async fn create_conversation(
    client: &Client,
    addr: SocketAddr,
    token: &str,
    other: Uuid,
) -> serde_json::Value {
    client
        .post(format!("http://{}/api/v1/conversations", addr))
        .bearer_auth(token)
        .json(&json!({ "userId": other }))
        .send()
        .await
        .expect("create conversation")
        .json::<serde_json::Value>()
        .await
        .expect("conversation json")
}

async fn send_message(
    client: &Client,
    addr: SocketAddr,
    token: &str,
    conversation_id: &str,
    content: &str,
) -> reqwest::Response {
    client
        .post(format!("http://{}/api/v1/messages", addr))
        .bearer_auth(token)
        .json(&json!({ "conversationId": conversation_id, "content": content }))
        .send()
        .await
        .expect("send message")
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let response = client
        .get(format!("http://{}/api/v1/conversations", addr))
        .send()
        .await
        .expect("list conversations");
    assert_eq!(response.status(), 401);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn conversation_get_or_create_is_idempotent() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;

    let first = create_conversation(&client, addr, &alice_token, bob_id).await;
    // 对方发起也命中同一个会话
    let second = create_conversation(&client, addr, &bob_token, alice_id).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["participants"].as_array().unwrap().len(), 2);

    // 与自己建会话是 400
    let response = client
        .post(format!("http://{}/api/v1/conversations", addr))
        .bearer_auth(&alice_token)
        .json(&json!({ "userId": alice_id }))
        .send()
        .await
        .expect("self conversation");
    assert_eq!(response.status(), 400);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn send_message_advances_conversation_and_pages_history() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (_alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, _bob_token) = register(&client, addr, "bob").await;

    let conversation = create_conversation(&client, addr, &alice_token, bob_id).await;
    let conversation_id = conversation["id"].as_str().unwrap();
    assert!(conversation["lastMessage"].is_null());

    let first = send_message(&client, addr, &alice_token, conversation_id, "one").await;
    assert_eq!(first.status(), 201);
    send_message(&client, addr, &alice_token, conversation_id, "two").await;

    // 会话列表携带最新一条消息
    let conversations = client
        .get(format!("http://{}/api/v1/conversations", addr))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("list")
        .json::<serde_json::Value>()
        .await
        .expect("list json");
    assert_eq!(conversations[0]["lastMessage"]["content"], "two");

    // 历史按时间升序
    let history = client
        .get(format!(
            "http://{}/api/v1/conversations/{}/messages?page=1&limit=10",
            addr, conversation_id
        ))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("history")
        .json::<serde_json::Value>()
        .await
        .expect("history json");
    assert_eq!(history["totalMessages"], 2);
    assert_eq!(history["messages"][0]["content"], "one");
    assert_eq!(history["messages"][1]["content"], "two");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn outsiders_cannot_send_or_read() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (_alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, _bob_token) = register(&client, addr, "bob").await;
    let (_mallory_id, mallory_token) = register(&client, addr, "mallory").await;

    let conversation = create_conversation(&client, addr, &alice_token, bob_id).await;
    let conversation_id = conversation["id"].as_str().unwrap();

    let response = send_message(&client, addr, &mallory_token, conversation_id, "hi").await;
    assert_eq!(response.status(), 403);

    let response = client
        .get(format!(
            "http://{}/api/v1/conversations/{}/messages",
            addr, conversation_id
        ))
        .bearer_auth(&mallory_token)
        .send()
        .await
        .expect("history");
    assert_eq!(response.status(), 403);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn read_receipt_flow() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (_alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;

    let conversation = create_conversation(&client, addr, &alice_token, bob_id).await;
    let conversation_id = conversation["id"].as_str().unwrap();

    let message = send_message(&client, addr, &alice_token, conversation_id, "hello")
        .await
        .json::<serde_json::Value>()
        .await
        .expect("message json");
    let message_id = message["id"].as_str().unwrap();
    assert_eq!(message["isRead"], false);

    // 发送者不能标记自己的消息
    let response = client
        .patch(format!("http://{}/api/v1/messages/{}/read", addr, message_id))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("self read");
    assert_eq!(response.status(), 400);

    let marked = client
        .patch(format!("http://{}/api/v1/messages/{}/read", addr, message_id))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("mark read")
        .json::<serde_json::Value>()
        .await
        .expect("marked json");
    assert_eq!(marked["isRead"], true);
    let read_at = marked["readAt"].clone();
    assert!(!read_at.is_null());

    // 重复标记是幂等的成功，readAt 不变
    let again = client
        .patch(format!("http://{}/api/v1/messages/{}/read", addr, message_id))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("mark read again")
        .json::<serde_json::Value>()
        .await
        .expect("marked json");
    assert_eq!(again["readAt"], read_at);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn notification_inbox_flow() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    let (_alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;

    let conversation = create_conversation(&client, addr, &alice_token, bob_id).await;
    let conversation_id = conversation["id"].as_str().unwrap();

    // 一条消息给 bob 产生一条 message 通知
    send_message(&client, addr, &alice_token, conversation_id, "hello").await;

    let unread = client
        .get(format!("http://{}/api/v1/notifications/unread-count", addr))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("unread count")
        .json::<serde_json::Value>()
        .await
        .expect("unread json");
    assert_eq!(unread["unreadCount"], 1);

    let page = client
        .get(format!("http://{}/api/v1/notifications", addr))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("list notifications")
        .json::<serde_json::Value>()
        .await
        .expect("page json");
    assert_eq!(page["totalNotifications"], 1);
    let notification_id = page["notifications"][0]["id"].as_str().unwrap();

    // 别人不能动 bob 的通知
    let response = client
        .patch(format!(
            "http://{}/api/v1/notifications/{}/read",
            addr, notification_id
        ))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("foreign mark read");
    assert_eq!(response.status(), 403);

    let marked = client
        .patch(format!(
            "http://{}/api/v1/notifications/{}/read",
            addr, notification_id
        ))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("mark read")
        .json::<serde_json::Value>()
        .await
        .expect("marked json");
    assert_eq!(marked["isRead"], true);

    let unread = client
        .get(format!("http://{}/api/v1/notifications/unread-count", addr))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("unread count")
        .json::<serde_json::Value>()
        .await
        .expect("unread json");
    assert_eq!(unread["unreadCount"], 0);

    let response = client
        .delete(format!(
            "http://{}/api/v1/notifications/{}",
            addr, notification_id
        ))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("delete");
    assert_eq!(response.status(), 204);

    let page = client
        .get(format!("http://{}/api/v1/notifications", addr))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("list notifications")
        .json::<serde_json::Value>()
        .await
        .expect("page json");
    assert_eq!(page["totalNotifications"], 0);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (addr, shutdown) = spawn_server().await;
    let client = Client::new();

    register(&client, addr, "alice").await;
    let response = client
        .post(format!("http://{}/api/v1/auth/register", addr))
        .json(&json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "secret-password"
        }))
        .send()
        .await
        .expect("duplicate register");
    assert_eq!(response.status(), 409);

    let _ = shutdown.send(());
}
