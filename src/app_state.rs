//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::domain::{EventBus, Notifier};
use crate::persistence::{RetryPolicy, VoteStore};
use crate::service::{EventService, VoteService, VoterService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event lifecycle and discovery.
    pub event_service: Arc<EventService>,
    /// Vote admission and tallies.
    pub vote_service: Arc<VoteService>,
    /// Voter accounts.
    pub voter_service: Arc<VoterService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires the service layer over `store` using the retry, bus, and
    /// identity settings from `config`.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>, config: &GatewayConfig) -> Self {
        let retry = RetryPolicy::from_config(config);
        let event_bus = EventBus::new(config.event_bus_capacity);
        let notifier: Arc<dyn Notifier> = Arc::new(event_bus.clone());

        Self {
            event_service: Arc::new(EventService::new(
                Arc::clone(&store),
                retry,
                Arc::clone(&notifier),
            )),
            vote_service: Arc::new(VoteService::new(
                Arc::clone(&store),
                retry,
                notifier,
                config.voter_identity_mode,
            )),
            voter_service: Arc::new(VoterService::new(store, retry, config.voter_identity_mode)),
            event_bus,
        }
    }
}
