//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered notifications.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{EventId, VoteNotification};
use crate::error::GatewayError;
use crate::service::VoteService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching notifications from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<VoteNotification>,
    vote_service: Arc<VoteService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs, &vote_service).await;
                        if let Some(json) = encode(&reply)
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Notification from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(notification) => {
                        if subs.matches(notification.event_id()) {
                            let payload = serde_json::to_value(&notification).unwrap_or_default();
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                payload,
                            );
                            if let Some(json) = encode(&msg)
                                && ws_tx.send(Message::text(json)).await.is_err() {
                                    break;
                                }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

fn encode(msg: &WsMessage) -> Option<String> {
    serde_json::to_string(msg).ok()
}

/// Handles a text message from the client, returning the reply envelope.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    vote_service: &VoteService,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error("", 400, "malformed JSON");
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 404, "unknown command");
    };

    match command {
        WsCommand::Subscribe { event_ids } => {
            let (ids, wildcard) = parse_event_ids(&event_ids);
            subs.subscribe(&ids, wildcard);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::Unsubscribe { event_ids } => {
            let (ids, wildcard) = parse_event_ids(&event_ids);
            subs.unsubscribe(&ids, wildcard);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::GetTally { event_id } => {
            let Ok(event_id) = event_id.parse::<EventId>() else {
                return WsMessage::error(msg.id, 400, "malformed event id");
            };
            match vote_service.compute_stats(event_id).await {
                Ok(stats) => WsMessage::new(
                    msg.id,
                    WsMessageType::Response,
                    serde_json::to_value(&stats).unwrap_or_default(),
                ),
                Err(err) => error_reply(msg.id, &err),
            }
        }
    }
}

/// Splits raw ids into parsed event ids and the wildcard flag. Malformed
/// ids are ignored.
fn parse_event_ids(raw: &[String]) -> (Vec<EventId>, bool) {
    let wildcard = raw.iter().any(|s| s == "*");
    let ids = raw
        .iter()
        .filter_map(|s| s.parse::<EventId>().ok())
        .collect();
    (ids, wildcard)
}

fn error_reply(id: String, err: &GatewayError) -> WsMessage {
    WsMessage::new(
        id,
        WsMessageType::Error,
        serde_json::json!({
            "code": err.error_code(),
            "message": err.to_string(),
        }),
    )
}
