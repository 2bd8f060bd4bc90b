//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    #[serde(default)]
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// A server message stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// An error reply carrying a numeric code and message.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u16, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast notification.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket, carried in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to notifications for specific events.
    Subscribe {
        /// Event IDs to subscribe to. Use `["*"]` for all events.
        event_ids: Vec<String>,
    },
    /// Unsubscribe from notifications for specific events.
    Unsubscribe {
        /// Event IDs to unsubscribe from.
        event_ids: Vec<String>,
    },
    /// Fetch the current tally of an event.
    GetTally {
        /// Target event ID.
        event_id: String,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_subscribe_with_wildcard() {
        let payload = serde_json::json!({ "command": "subscribe", "event_ids": ["*"] });
        let Ok(cmd) = serde_json::from_value::<WsCommand>(payload) else {
            panic!("expected subscribe");
        };
        assert_eq!(
            cmd,
            WsCommand::Subscribe {
                event_ids: vec!["*".to_string()]
            }
        );
    }

    #[test]
    fn envelope_timestamp_is_optional_for_clients() {
        let raw = r#"{"id":"1","type":"command","payload":{"command":"get_tally","event_id":"x"}}"#;
        let Ok(msg) = serde_json::from_str::<WsMessage>(raw) else {
            panic!("expected envelope");
        };
        assert_eq!(msg.msg_type, WsMessageType::Command);
    }

    #[test]
    fn unknown_command_is_rejected() {
        let payload = serde_json::json!({ "command": "swap" });
        assert!(serde_json::from_value::<WsCommand>(payload).is_err());
    }
}
