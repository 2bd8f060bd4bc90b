//! Vote service: admission, per-voter status and history, and tallies.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Event, EventId, IdentityMode, Notifier, TallyStats, Vote, VoteMetadata, VoteNotification,
    VoterId,
};
use crate::error::GatewayError;
use crate::persistence::{RetryPolicy, VoteInsert, VoteStore};

/// Whether a voter has voted in an event, and for whom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct VoteStatus {
    /// `true` once a vote is admitted.
    pub has_voted: bool,
    /// Team chosen.
    pub voted_for: Option<String>,
    /// Admission time.
    pub voted_at: Option<DateTime<Utc>>,
}

/// One row of a voter's history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntry {
    /// Event voted in.
    pub event_id: EventId,
    /// Event name.
    pub event_name: String,
    /// Event description.
    pub event_description: Option<String>,
    /// Team chosen.
    pub team: String,
    /// Admission time.
    pub voted_at: DateTime<Utc>,
    /// Event window start.
    pub event_start_date: DateTime<Utc>,
    /// Event window end.
    pub event_end_date: DateTime<Utc>,
}

/// An open event as presented to a voter about to cast a ballot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Ballot {
    /// The event.
    pub event: Event,
    /// The voter's current status in it.
    pub status: VoteStatus,
}

/// Orchestration layer for the vote ledger.
///
/// Admission never locks: the store's conditional insert is the only
/// arbiter of the one-vote-per-voter rule, so concurrent attempts by the
/// same voter resolve to exactly one success.
#[derive(Debug, Clone)]
pub struct VoteService {
    store: Arc<dyn VoteStore>,
    retry: RetryPolicy,
    notifier: Arc<dyn Notifier>,
    identity_mode: IdentityMode,
}

impl VoteService {
    /// Creates a new `VoteService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn VoteStore>,
        retry: RetryPolicy,
        notifier: Arc<dyn Notifier>,
        identity_mode: IdentityMode,
    ) -> Self {
        Self {
            store,
            retry,
            notifier,
            identity_mode,
        }
    }

    /// Admits `voter`'s vote for `team_name` in `event_id`.
    ///
    /// Checks run in order: event exists, event is open, team is one of the
    /// event's teams, voter exists and (in `VerifiedEmail` mode) is
    /// verified, voter has not voted. On success the ledger row and the
    /// counter increment are persisted together, then a `vote_cast`
    /// notification is published best-effort.
    ///
    /// The insert itself is not retried: if it times out the outcome is
    /// unknown and the caller gets [`GatewayError::StorageUnavailable`];
    /// a follow-up [`Self::vote_status`] tells whether it landed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`], [`GatewayError::EventNotOpen`],
    /// [`GatewayError::InvalidTeamSelection`], [`GatewayError::NotFound`],
    /// [`GatewayError::VoterNotVerified`], [`GatewayError::DuplicateVote`],
    /// or a storage error.
    pub async fn admit_vote(
        &self,
        event_id: EventId,
        voter_id: VoterId,
        team_name: &str,
        metadata: VoteMetadata,
    ) -> Result<Vote, GatewayError> {
        let now = Utc::now();
        let event = self.load(event_id).await?;
        if !event.is_open(now) {
            return Err(GatewayError::EventNotOpen(event_id));
        }

        let team = event
            .team_by_name(team_name)
            .ok_or_else(|| GatewayError::InvalidTeamSelection(team_name.to_string()))?;

        let voter = self
            .retry
            .run("get_voter", || self.store.get_voter(voter_id))
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("voter {voter_id}")))?;
        if self.identity_mode == IdentityMode::VerifiedEmail && !voter.is_verified {
            return Err(GatewayError::VoterNotVerified);
        }

        if let Some(existing) = self
            .retry
            .run("find_vote", || self.store.find_vote(event_id, voter_id))
            .await?
        {
            return Err(duplicate(&event, &existing));
        }

        let vote = Vote::new(event_id, voter_id, team, metadata, now);
        match self
            .retry
            .once("insert_vote", self.store.insert_vote(&vote))
            .await?
        {
            VoteInsert::Inserted { total_votes } => {
                let delivered = self.notifier.publish(VoteNotification::VoteCast {
                    event_id,
                    team_name: vote.team_name.clone(),
                    total_votes,
                    timestamp: vote.voted_at,
                });
                tracing::info!(
                    %event_id,
                    %voter_id,
                    team = %vote.team_name,
                    total_votes,
                    delivered,
                    "vote admitted"
                );
                Ok(vote)
            }
            VoteInsert::Duplicate(existing) => {
                tracing::debug!(%event_id, %voter_id, "concurrent duplicate vote rejected");
                Err(duplicate(&event, &existing))
            }
            VoteInsert::TeamUnavailable => {
                tracing::debug!(
                    %event_id,
                    %voter_id,
                    team = %team_name,
                    "team removed during admission"
                );
                Err(GatewayError::InvalidTeamSelection(team_name.to_string()))
            }
        }
    }

    /// Whether `voter` has voted in `event_id`. Never errors on an unknown
    /// event; it simply reports no vote. `voted_for` is the team's current
    /// name.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn vote_status(
        &self,
        event_id: EventId,
        voter_id: VoterId,
    ) -> Result<VoteStatus, GatewayError> {
        let Some(vote) = self
            .retry
            .run("find_vote", || self.store.find_vote(event_id, voter_id))
            .await?
        else {
            return Ok(VoteStatus::default());
        };
        let event = self
            .retry
            .run("get_event", || self.store.get_event(event_id))
            .await?;
        Ok(VoteStatus {
            has_voted: true,
            voted_for: Some(vote.current_team_name(event.as_ref())),
            voted_at: Some(vote.voted_at),
        })
    }

    /// An open event and the voter's status in it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] or
    /// [`GatewayError::EventNotOpen`].
    pub async fn ballot(&self, event_id: EventId, voter_id: VoterId) -> Result<Ballot, GatewayError> {
        let event = self.load(event_id).await?;
        if !event.is_open(Utc::now()) {
            return Err(GatewayError::EventNotOpen(event_id));
        }
        let status = self.vote_status(event_id, voter_id).await?;
        Ok(Ballot { event, status })
    }

    /// Every vote `voter` cast, newest first, joined with its event.
    /// Votes whose event no longer exists are skipped.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn history(&self, voter_id: VoterId) -> Result<Vec<HistoryEntry>, GatewayError> {
        let votes = self
            .retry
            .run("votes_by_voter", || self.store.votes_by_voter(voter_id))
            .await?;

        let mut events: HashMap<EventId, Option<Event>> = HashMap::new();
        let mut entries = Vec::with_capacity(votes.len());
        for vote in votes {
            if !events.contains_key(&vote.event_id) {
                let event = self
                    .retry
                    .run("get_event", || self.store.get_event(vote.event_id))
                    .await?;
                events.insert(vote.event_id, event);
            }
            let Some(Some(event)) = events.get(&vote.event_id) else {
                continue;
            };
            entries.push(HistoryEntry {
                event_id: event.id,
                event_name: event.name.clone(),
                event_description: event.description.clone(),
                team: vote.current_team_name(Some(event)),
                voted_at: vote.voted_at,
                event_start_date: event.start_date,
                event_end_date: event.end_date,
            });
        }
        Ok(entries)
    }

    /// Tally for `event_id`, computed from the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] or a storage error.
    pub async fn compute_stats(&self, event_id: EventId) -> Result<TallyStats, GatewayError> {
        let event = self.load(event_id).await?;
        self.tally(&event).await
    }

    /// Public results by voting slug, regardless of whether voting is open.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown slug, or a storage
    /// error.
    pub async fn compute_stats_by_slug(
        &self,
        slug: &str,
    ) -> Result<(Event, TallyStats), GatewayError> {
        let event = self
            .retry
            .run("get_event_by_slug", || self.store.get_event_by_slug(slug))
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("event with slug {slug}")))?;
        let stats = self.tally(&event).await?;
        Ok((event, stats))
    }

    async fn tally(&self, event: &Event) -> Result<TallyStats, GatewayError> {
        let votes = self
            .retry
            .run("votes_for_event", || self.store.votes_for_event(event.id))
            .await?;
        Ok(TallyStats::compute(event, &votes))
    }

    async fn load(&self, id: EventId) -> Result<Event, GatewayError> {
        self.retry
            .run("get_event", || self.store.get_event(id))
            .await?
            .ok_or(GatewayError::EventNotFound(id))
    }
}

/// Duplicate error naming the team the voter picked, under its current name
/// when the team still exists.
fn duplicate(event: &Event, existing: &Vote) -> GatewayError {
    GatewayError::DuplicateVote {
        voted_for: existing.current_team_name(Some(event)),
    }
}
