//! Service layer: business logic orchestration.
//!
//! Services hold a shared [`VoteStore`](crate::persistence::VoteStore),
//! wrap each store call in a [`RetryPolicy`](crate::persistence::RetryPolicy),
//! and publish changes through a [`Notifier`](crate::domain::Notifier).

pub mod event_service;
pub mod vote_service;
pub mod voter_service;

pub use event_service::{
    Dashboard, DashboardCounts, EventDetail, EventService, OpenEvent, RecentVote, VoterVote,
};
pub use vote_service::{Ballot, HistoryEntry, VoteService, VoteStatus};
pub use voter_service::VoterService;
