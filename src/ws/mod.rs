//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes vote and event-lifecycle
//! notifications to clients subscribed to the matching event ids, and
//! answers `get_tally` queries.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
