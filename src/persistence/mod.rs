//! Persistence layer: event store, vote ledger, and voter accounts.
//!
//! [`VoteStore`] is the seam between the services and durable storage.
//! Two implementations ship: [`memory::MemoryStore`] for tests and
//! single-node deployments, and [`postgres::PostgresStore`] backed by
//! `sqlx::PgPool`. Both enforce the `(event, voter)` exclusivity natively:
//! a unique index in PostgreSQL, a conditional insert under the write lock
//! in memory. Services never lock around it.
//!
//! The same holds between team edits and admissions: `update_event` refuses
//! to drop a team that holds votes, and `insert_vote` refuses a team the
//! stored event no longer lists, both under the event's lock.
//!
//! Every call is wrapped by [`retry::RetryPolicy`], which bounds it with a
//! timeout and retries transient failures.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod retry;

use std::collections::HashSet;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AdminId, Event, EventId, TeamId, Vote, Voter, VoterId, VoterLogin};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use retry::RetryPolicy;

/// Storage-level failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Connectivity lost or pool exhausted; safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete in time.
    #[error("store operation '{op}' timed out")]
    Timeout {
        /// Name of the timed-out operation.
        op: &'static str,
    },

    /// A uniqueness constraint other than the vote pair was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the failure is worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Outcome of the conditional vote insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteInsert {
    /// The vote was appended; carries the event's counter after increment.
    Inserted {
        /// Denormalized vote total after this vote.
        total_votes: u64,
    },
    /// A vote for the same `(event, voter)` pair already exists.
    Duplicate(Vote),
    /// The stored event no longer lists the vote's team.
    TeamUnavailable,
}

/// Outcome of an event overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventUpdate {
    /// The new fields were written.
    Updated,
    /// No event with that id.
    Missing,
    /// The new team list drops a team that holds votes; nothing was written.
    TeamHasVotes(TeamId),
}

/// Durable storage for events, votes, and voters.
#[async_trait]
pub trait VoteStore: Send + Sync + Debug {
    // ── Events ──────────────────────────────────────────────────────────

    /// Persists a new event.
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Fetches an event by id.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Fetches an event by voting slug.
    async fn get_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;

    /// Lists events owned by `owner`, newest first.
    async fn list_events_by_owner(&self, owner: AdminId) -> Result<Vec<Event>, StoreError>;

    /// Lists events open at `now`, ending soonest first.
    async fn list_open_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>, StoreError>;

    /// Overwrites an event's editable fields. Never touches `total_votes`.
    ///
    /// Checked atomically with the write: if any admitted vote references a
    /// team missing from `event.teams`, nothing is written.
    async fn update_event(&self, event: &Event) -> Result<EventUpdate, StoreError>;

    /// Deletes an event and every vote referencing it. Returns `false` if
    /// the event does not exist.
    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError>;

    // ── Vote ledger ─────────────────────────────────────────────────────

    /// Appends `vote` unless the pair already voted or the stored event no
    /// longer lists `vote.team_id`, incrementing the event counter and
    /// stamping the voter's `last_vote_at` in the same atomic step.
    async fn insert_vote(&self, vote: &Vote) -> Result<VoteInsert, StoreError>;

    /// Fetches the vote of `voter` in `event`, if any.
    async fn find_vote(&self, event: EventId, voter: VoterId)
    -> Result<Option<Vote>, StoreError>;

    /// All votes of an event, oldest first.
    async fn votes_for_event(&self, event: EventId) -> Result<Vec<Vote>, StoreError>;

    /// All votes of a voter, newest first.
    async fn votes_by_voter(&self, voter: VoterId) -> Result<Vec<Vote>, StoreError>;

    /// The `limit` most recent votes across all events.
    async fn recent_votes(&self, limit: usize) -> Result<Vec<Vote>, StoreError>;

    /// Total number of ledger rows.
    async fn count_votes(&self) -> Result<u64, StoreError>;

    // ── Voters ──────────────────────────────────────────────────────────

    /// Returns the voter keyed by `login.identity_key`, creating it first if
    /// needed.
    async fn upsert_voter(&self, login: &VoterLogin) -> Result<Voter, StoreError>;

    /// Fetches a voter by id.
    async fn get_voter(&self, id: VoterId) -> Result<Option<Voter>, StoreError>;

    /// Fetches the voters among `ids` that exist.
    async fn get_voters(&self, ids: &HashSet<VoterId>) -> Result<Vec<Voter>, StoreError>;

    /// All voters, newest first.
    async fn list_voters(&self) -> Result<Vec<Voter>, StoreError>;

    /// Sets the verification flag, returning the updated voter.
    async fn set_voter_verified(
        &self,
        id: VoterId,
        verified: bool,
    ) -> Result<Option<Voter>, StoreError>;
}
