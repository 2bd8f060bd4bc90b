//! Domain layer: core types, tally math, and the change notifier.
//!
//! This module holds the server-side model: typed identifiers, events
//! with their embedded teams, vote ledger rows, voters, read-time tallies,
//! and the broadcast bus used to tell live viewers that something changed.

pub mod event;
pub mod event_bus;
pub mod ids;
pub mod notification;
pub mod tally;
pub mod vote;
pub mod voter;

pub use event::{Event, EventPatch, NewEvent, Team, TeamSpec};
pub use event_bus::{EventBus, Notifier};
pub use ids::{AdminId, EventId, TeamId, VoteId, VoterId};
pub use notification::VoteNotification;
pub use tally::{TallyStats, TeamTally};
pub use vote::{Vote, VoteMetadata};
pub use voter::{IdentityMode, Voter, VoterLogin};
