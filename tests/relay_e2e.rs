//! End-to-end tests: a real relay on a loopback port driven over
//! WebSocket and HTTP.

#![allow(clippy::panic, missing_docs)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use room_relay::api::build_app;
use room_relay::app_state::AppState;
use room_relay::config::RelayConfig;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_relay() -> SocketAddr {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    let app = build_app(AppState::in_memory(&RelayConfig::default()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn connect(addr: SocketAddr, client_id: &str, name: &str) -> Client {
    let url = format!("ws://{addr}/ws?client_id={client_id}&name={name}");
    let Ok((mut ws, _)) = connect_async(url).await else {
        panic!("ws connect failed");
    };
    let welcome = next_event(&mut ws).await;
    assert_eq!(welcome["event"], "welcome");
    ws
}

async fn send(ws: &mut Client, event: Value) {
    if ws.send(Message::text(event.to_string())).await.is_err() {
        panic!("send failed");
    }
}

async fn next_event(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next()).await;
        let Ok(Some(Ok(frame))) = frame else {
            panic!("no event received");
        };
        if let Message::Text(text) = frame {
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("invalid json frame");
            };
            return value;
        }
    }
}

/// Reads until an event of the given type arrives, skipping others
/// (e.g. room list pushes).
async fn expect_event(ws: &mut Client, kind: &str) -> Value {
    loop {
        let event = next_event(ws).await;
        if event["event"] == kind {
            return event;
        }
    }
}

#[tokio::test]
async fn chat_scenario_history_rename_and_broadcast() {
    let addr = spawn_relay().await;
    let mut a = connect(addr, "1", "alice").await;

    send(&mut a, json!({"event": "join_room", "room": "Dev Circle"})).await;
    let history = expect_event(&mut a, "history_loaded").await;
    assert_eq!(history["messages"], json!([]));

    send(&mut a, json!({"event": "send_message", "content": "hello", "room": "Dev Circle"})).await;
    let echoed = expect_event(&mut a, "new_message").await;
    assert_eq!(echoed["message"]["content"], "hello");

    let mut b = connect(addr, "2", "bea").await;
    send(&mut b, json!({"event": "join_room", "room": "Dev Circle"})).await;
    let history = expect_event(&mut b, "history_loaded").await;
    assert_eq!(history["messages"].as_array().map(Vec::len), Some(1));
    assert_eq!(history["messages"][0]["content"], "hello");
    assert_eq!(history["messages"][0]["room"], "Dev Circle");

    send(&mut a, json!({"event": "request_rename", "name": "Bob"})).await;
    for ws in [&mut a, &mut b] {
        let applied = expect_event(ws, "rename_applied").await;
        assert_eq!(applied["client_id"], "1");
        assert_eq!(applied["display_name"], "Bob");
    }

    send(&mut a, json!({"event": "send_message", "content": "hi"})).await;
    for ws in [&mut a, &mut b] {
        let message = expect_event(ws, "new_message").await;
        assert_eq!(message["message"]["author"], "Bob");
        assert_eq!(message["message"]["content"], "hi");
    }
}

#[tokio::test]
async fn client_errors_are_unicast_and_session_survives() {
    let addr = spawn_relay().await;
    let mut a = connect(addr, "1", "alice").await;
    let mut b = connect(addr, "2", "bob").await;

    send(&mut a, json!({"event": "send_message", "content": "too early"})).await;
    let error = expect_event(&mut a, "error").await;
    assert_eq!(error["code"], 2001);

    if a.send(Message::text("{not json")).await.is_err() {
        panic!("send failed");
    }
    let error = expect_event(&mut a, "error").await;
    assert_eq!(error["code"], 1000);

    send(&mut a, json!({"event": "change_username", "userId": 1, "newUsername": "bob"})).await;
    let rejected = expect_event(&mut a, "rename_rejected").await;
    assert_eq!(rejected["reason"], "name_taken");

    // nothing of the above reached the other connection
    let quiet = tokio::time::timeout(Duration::from_millis(200), b.next()).await;
    assert!(quiet.is_err());

    send(&mut a, json!({"event": "join_room", "room": "Dev Circle"})).await;
    let history = expect_event(&mut a, "history_loaded").await;
    assert_eq!(history["room"], "Dev Circle");
}

#[tokio::test]
async fn room_list_always_has_default_room() {
    let addr = spawn_relay().await;
    let mut a = connect(addr, "1", "alice").await;

    send(&mut a, json!({"event": "get_rooms"})).await;
    let list = expect_event(&mut a, "room_list").await;
    assert_eq!(list["rooms"], json!(["Dev Circle"]));

    send(&mut a, json!({"event": "join_room", "room": "ops"})).await;
    let pushed = expect_event(&mut a, "room_list").await;
    assert_eq!(pushed["rooms"], json!(["Dev Circle", "ops"]));

    let Ok(response) = reqwest::get(format!("http://{addr}/api/v1/rooms")).await else {
        panic!("http request failed");
    };
    let Ok(body) = response.json::<Value>().await else {
        panic!("invalid json body");
    };
    assert_eq!(body["data"][0]["name"], "Dev Circle");
    assert_eq!(body["data"][1]["name"], "ops");
    assert_eq!(body["data"][1]["subscriber_count"], 1);
}

#[tokio::test]
async fn disconnect_releases_name_and_membership() {
    let addr = spawn_relay().await;
    let mut a = connect(addr, "1", "alice").await;
    send(&mut a, json!({"event": "join_room", "room": "Dev Circle"})).await;
    let _ = expect_event(&mut a, "history_loaded").await;
    drop(a);

    let mut b = connect(addr, "2", "bob").await;
    // the relay notices the dropped socket asynchronously
    let mut renamed = false;
    for _ in 0..50 {
        send(&mut b, json!({"event": "request_rename", "name": "alice"})).await;
        let reply = next_event(&mut b).await;
        if reply["event"] == "rename_applied" {
            renamed = true;
            break;
        }
        assert_eq!(reply["reason"], "name_taken");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(renamed);

    let Ok(response) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("http request failed");
    };
    let Ok(health) = response.json::<Value>().await else {
        panic!("invalid json body");
    };
    assert_eq!(health["connections"], 1);
}
