//! # vote-gateway
//!
//! REST API and WebSocket gateway for timed team-voting events.
//!
//! Administrators schedule events with a list of teams; voters cast at most
//! one vote per event while it is open; anyone holding the voting link can
//! watch live tallies, pushed over WebSocket as votes land.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── EventService / VoteService / VoterService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── VoteStore + RetryPolicy (persistence/)
//!     │
//!     └── PostgreSQL or in-memory tables
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
