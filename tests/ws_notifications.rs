//! WebSocket notification tests against a server bound to an ephemeral port.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use vote_gateway::api::build_app;
use vote_gateway::app_state::AppState;
use vote_gateway::config::GatewayConfig;
use vote_gateway::persistence::MemoryStore;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_app() -> String {
    let config = GatewayConfig::default();
    let state = AppState::new(Arc::new(MemoryStore::new()), &config);
    let app = build_app(state, Duration::from_secs(5));

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr.to_string()
}

async fn connect(addr: &str) -> Socket {
    let Ok((socket, _)) = connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect failed");
    };
    socket
}

async fn send_command(socket: &mut Socket, id: &str, payload: Value) {
    let envelope = json!({ "id": id, "type": "command", "payload": payload });
    let Ok(()) = socket.send(Message::text(envelope.to_string())).await else {
        panic!("ws send failed");
    };
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(3), socket.next()).await
        else {
            panic!("no ws message within timeout");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("ws message is not JSON");
            };
            return value;
        }
    }
}

async fn create_event(client: &reqwest::Client, addr: &str, admin: &str) -> String {
    let now = Utc::now();
    let Ok(resp) = client
        .post(format!("http://{addr}/api/v1/admin/events"))
        .header("x-admin-id", admin)
        .json(&json!({
            "name": "Semi Final",
            "teams": [{ "name": "Red" }, { "name": "Blue" }],
            "start_date": now - chrono::Duration::hours(1),
            "end_date": now + chrono::Duration::hours(1),
        }))
        .send()
        .await
    else {
        panic!("create request failed");
    };
    let Ok(body) = resp.json::<Value>().await else {
        panic!("create body");
    };
    let Some(id) = body["id"].as_str() else {
        panic!("event id missing: {body}");
    };
    id.to_string()
}

async fn login_and_vote(client: &reqwest::Client, addr: &str, name: &str, event: &str, team: &str) {
    let Ok(resp) = client
        .post(format!("http://{addr}/api/v1/voters/login"))
        .json(&json!({ "name": name }))
        .send()
        .await
    else {
        panic!("login request failed");
    };
    let Ok(body) = resp.json::<Value>().await else {
        panic!("login body");
    };
    let Some(voter) = body["voter"]["id"].as_str() else {
        panic!("voter id missing: {body}");
    };
    let Ok(resp) = client
        .post(format!("http://{addr}/api/v1/voter/events/{event}/vote"))
        .header("x-voter-id", voter)
        .json(&json!({ "team": team }))
        .send()
        .await
    else {
        panic!("vote request failed");
    };
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
}

#[tokio::test]
async fn subscribers_only_see_their_event() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = uuid::Uuid::new_v4().to_string();
    let watched = create_event(&client, &addr, &admin).await;
    let other = create_event(&client, &addr, &admin).await;

    let mut socket = connect(&addr).await;
    send_command(
        &mut socket,
        "sub-1",
        json!({ "command": "subscribe", "event_ids": [watched] }),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["id"], "sub-1");
    assert_eq!(reply["payload"]["count"], 1);

    login_and_vote(&client, &addr, "Voter One", &other, "Red").await;
    login_and_vote(&client, &addr, "Voter Two", &watched, "Blue").await;

    let event = next_json(&mut socket).await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["payload"]["event_type"], "vote_cast");
    assert_eq!(event["payload"]["event_id"], watched.as_str());
    assert_eq!(event["payload"]["team_name"], "Blue");
    assert_eq!(event["payload"]["total_votes"], 1);
}

#[tokio::test]
async fn wildcard_receives_lifecycle_notifications() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();
    let mut socket = connect(&addr).await;

    send_command(
        &mut socket,
        "sub-all",
        json!({ "command": "subscribe", "event_ids": ["*"] }),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["payload"]["wildcard"], true);

    let event_id = create_event(&client, &addr, &uuid::Uuid::new_v4().to_string()).await;
    let created = next_json(&mut socket).await;
    assert_eq!(created["payload"]["event_type"], "event_created");
    assert_eq!(created["payload"]["event_id"], event_id.as_str());
}

#[tokio::test]
async fn get_tally_returns_current_results() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();
    let event_id = create_event(&client, &addr, &uuid::Uuid::new_v4().to_string()).await;
    login_and_vote(&client, &addr, "Voter One", &event_id, "Red").await;

    let mut socket = connect(&addr).await;
    send_command(
        &mut socket,
        "tally-1",
        json!({ "command": "get_tally", "event_id": event_id }),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["payload"]["total_votes"], 1);
    assert_eq!(reply["payload"]["teams"][0]["name"], "Red");
    assert_eq!(reply["payload"]["teams"][0]["percentage"], 100.0);
}

#[tokio::test]
async fn malformed_messages_get_error_replies() {
    let addr = spawn_app().await;
    let mut socket = connect(&addr).await;

    let Ok(()) = socket.send(Message::text("{not json")).await else {
        panic!("ws send failed");
    };
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], 400);
}
