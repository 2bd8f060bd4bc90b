//! Event service: event lifecycle, discovery, and the admin dashboard.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    AdminId, Event, EventId, EventPatch, NewEvent, Notifier, TallyStats, TeamId,
    VoteNotification, VoterId,
};
use crate::error::GatewayError;
use crate::persistence::{EventUpdate, RetryPolicy, VoteStore};

/// Number of events shown on the dashboard.
const DASHBOARD_RECENT_EVENTS: usize = 5;

/// Number of votes shown on the dashboard.
const DASHBOARD_RECENT_VOTES: usize = 10;

/// One row of an event's voter list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VoterVote {
    /// Voter id.
    pub voter_id: VoterId,
    /// Voter name, if the account still exists.
    pub voter_name: Option<String>,
    /// Voter email, if any.
    pub voter_email: Option<String>,
    /// Team chosen.
    pub team: String,
    /// Admission time.
    pub voted_at: DateTime<Utc>,
}

/// Admin view of an event with tally and voter list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventDetail {
    /// The event.
    pub event: Event,
    /// Ledger-derived tally.
    pub stats: TallyStats,
    /// Who voted for what, oldest first.
    pub voters: Vec<VoterVote>,
}

/// An open event annotated for a specific voter.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OpenEvent {
    /// The event.
    #[serde(flatten)]
    pub event: Event,
    /// Whether the voter already voted in it.
    pub has_voted: bool,
}

/// Aggregate counters on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardCounts {
    /// Events owned by the admin.
    pub total_events: u64,
    /// Owned events open right now.
    pub active_events: u64,
    /// All voter accounts.
    pub total_voters: u64,
    /// Verified voter accounts.
    pub verified_voters: u64,
    /// All ledger rows.
    pub total_votes: u64,
}

/// A recent vote with resolved names.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecentVote {
    /// Event voted in.
    pub event_id: EventId,
    /// Event name.
    pub event_name: Option<String>,
    /// Voter.
    pub voter_id: VoterId,
    /// Voter name.
    pub voter_name: Option<String>,
    /// Team chosen.
    pub team: String,
    /// Admission time.
    pub voted_at: DateTime<Utc>,
}

/// Admin dashboard payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    /// Aggregate counters.
    pub stats: DashboardCounts,
    /// Newest owned events.
    pub recent_events: Vec<Event>,
    /// Newest votes across all events.
    pub recent_votes: Vec<RecentVote>,
}

/// Orchestration layer for the event store.
///
/// Admin operations take the caller's [`AdminId`] explicitly and only see
/// events that admin owns; anything else reads as not found.
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<dyn VoteStore>,
    retry: RetryPolicy,
    notifier: Arc<dyn Notifier>,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>, retry: RetryPolicy, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            retry,
            notifier,
        }
    }

    /// Validates and persists a new event owned by `admin`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for invalid input, or a storage
    /// error.
    pub async fn create(&self, admin: AdminId, draft: NewEvent) -> Result<Event, GatewayError> {
        let event = Event::create(draft, admin, Utc::now())?;
        self.retry
            .once("insert_event", self.store.insert_event(&event))
            .await?;

        self.notifier.publish(VoteNotification::EventCreated {
            event_id: event.id,
            name: event.name.clone(),
            timestamp: event.created_at,
        });

        tracing::info!(event_id = %event.id, %admin, teams = event.teams.len(), "event created");
        Ok(event)
    }

    /// Lists the admin's events, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_for_admin(&self, admin: AdminId) -> Result<Vec<Event>, GatewayError> {
        Ok(self
            .retry
            .run("list_events_by_owner", || self.store.list_events_by_owner(admin))
            .await?)
    }

    /// Fetches one of the admin's events.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if it does not exist or
    /// belongs to another admin.
    pub async fn get_for_admin(&self, admin: AdminId, id: EventId) -> Result<Event, GatewayError> {
        let event = self.load(id).await?;
        if event.created_by != admin {
            return Err(GatewayError::EventNotFound(id));
        }
        Ok(event)
    }

    /// Event with its tally and the list of who voted for what.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_for_admin`].
    pub async fn detail_for_admin(
        &self,
        admin: AdminId,
        id: EventId,
    ) -> Result<EventDetail, GatewayError> {
        let event = self.get_for_admin(admin, id).await?;
        let votes = self
            .retry
            .run("votes_for_event", || self.store.votes_for_event(id))
            .await?;

        let voter_ids: HashSet<VoterId> = votes.iter().map(|v| v.voter_id).collect();
        let voters: HashMap<VoterId, _> = self
            .retry
            .run("get_voters", || self.store.get_voters(&voter_ids))
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let stats = TallyStats::compute(&event, &votes);
        let voter_list = votes
            .iter()
            .map(|vote| {
                let voter = voters.get(&vote.voter_id);
                VoterVote {
                    voter_id: vote.voter_id,
                    voter_name: voter.map(|v| v.name.clone()),
                    voter_email: voter.and_then(|v| v.email.clone()),
                    team: vote.current_team_name(Some(&event)),
                    voted_at: vote.voted_at,
                }
            })
            .collect();

        Ok(EventDetail {
            event,
            stats,
            voters: voter_list,
        })
    }

    /// Applies a partial update to one of the admin's events.
    ///
    /// Admitted votes and the vote counter are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] or
    /// [`GatewayError::Validation`].
    pub async fn update(
        &self,
        admin: AdminId,
        id: EventId,
        patch: EventPatch,
    ) -> Result<Event, GatewayError> {
        let current = self.get_for_admin(admin, id).await?;

        let voted_teams: HashSet<TeamId> = if patch.teams.is_some() {
            self.retry
                .run("votes_for_event", || self.store.votes_for_event(id))
                .await?
                .iter()
                .map(|v| v.team_id)
                .collect()
        } else {
            HashSet::new()
        };

        let next = current.apply_patch(patch, &voted_teams, Utc::now())?;
        // The votes read above may be stale; the store re-checks under its lock.
        match self
            .retry
            .run("update_event", || self.store.update_event(&next))
            .await?
        {
            EventUpdate::Updated => {}
            EventUpdate::Missing => return Err(GatewayError::EventNotFound(id)),
            EventUpdate::TeamHasVotes(team_id) => {
                let name = current
                    .team(team_id)
                    .map_or_else(|| team_id.to_string(), |t| t.name.clone());
                return Err(GatewayError::Validation(format!(
                    "team '{name}' has recorded votes and cannot be removed"
                )));
            }
        }

        self.notifier.publish(VoteNotification::EventUpdated {
            event_id: id,
            timestamp: next.updated_at,
        });

        tracing::info!(event_id = %id, %admin, is_active = next.is_active, "event updated");
        self.load(id).await
    }

    /// Flips the admin kill switch.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update`].
    pub async fn set_active(
        &self,
        admin: AdminId,
        id: EventId,
        active: bool,
    ) -> Result<Event, GatewayError> {
        let patch = EventPatch {
            is_active: Some(active),
            ..EventPatch::default()
        };
        self.update(admin, id, patch).await
    }

    /// Deletes one of the admin's events together with all its votes.
    /// Irreversible.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] or a storage error.
    pub async fn delete(&self, admin: AdminId, id: EventId) -> Result<(), GatewayError> {
        self.get_for_admin(admin, id).await?;
        // A `false` here means the event is already gone, which is the goal.
        self.retry
            .run("delete_event", || self.store.delete_event(id))
            .await?;

        self.notifier.publish(VoteNotification::EventDeleted {
            event_id: id,
            timestamp: Utc::now(),
        });

        tracing::info!(event_id = %id, %admin, "event deleted with its votes");
        Ok(())
    }

    /// Public lookup by voting slug; only open events are visible.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if no open event has that slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Event, GatewayError> {
        let now = Utc::now();
        self.retry
            .run("get_event_by_slug", || self.store.get_event_by_slug(slug))
            .await?
            .filter(|e| e.is_open(now))
            .ok_or_else(|| GatewayError::NotFound("open event for this link".to_string()))
    }

    /// Events open right now, ending soonest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_open(&self) -> Result<Vec<Event>, GatewayError> {
        let now = Utc::now();
        Ok(self
            .retry
            .run("list_open_events", || self.store.list_open_events(now))
            .await?)
    }

    /// Open events annotated with whether `voter` already voted.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_open_for_voter(&self, voter: VoterId) -> Result<Vec<OpenEvent>, GatewayError> {
        let events = self.list_open().await?;
        let voted: HashSet<EventId> = self
            .retry
            .run("votes_by_voter", || self.store.votes_by_voter(voter))
            .await?
            .iter()
            .map(|v| v.event_id)
            .collect();

        Ok(events
            .into_iter()
            .map(|event| OpenEvent {
                has_voted: voted.contains(&event.id),
                event,
            })
            .collect())
    }

    /// Builds the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn dashboard(&self, admin: AdminId) -> Result<Dashboard, GatewayError> {
        let now = Utc::now();
        let owned = self.list_for_admin(admin).await?;
        let voters = self.retry.run("list_voters", || self.store.list_voters()).await?;
        let total_votes = self.retry.run("count_votes", || self.store.count_votes()).await?;
        let recent = self
            .retry
            .run("recent_votes", || self.store.recent_votes(DASHBOARD_RECENT_VOTES))
            .await?;

        let mut events: HashMap<EventId, Option<Event>> =
            owned.iter().map(|e| (e.id, Some(e.clone()))).collect();
        for vote in &recent {
            if !events.contains_key(&vote.event_id) {
                let event = self
                    .retry
                    .run("get_event", || self.store.get_event(vote.event_id))
                    .await?;
                events.insert(vote.event_id, event);
            }
        }
        let voter_names: HashMap<VoterId, String> =
            voters.iter().map(|v| (v.id, v.name.clone())).collect();

        let stats = DashboardCounts {
            total_events: owned.len() as u64,
            active_events: owned.iter().filter(|e| e.is_open(now)).count() as u64,
            total_voters: voters.len() as u64,
            verified_voters: voters.iter().filter(|v| v.is_verified).count() as u64,
            total_votes,
        };

        let recent_votes = recent
            .into_iter()
            .map(|vote| {
                let event = events.get(&vote.event_id).and_then(Option::as_ref);
                RecentVote {
                    event_name: event.map(|e| e.name.clone()),
                    voter_name: voter_names.get(&vote.voter_id).cloned(),
                    team: vote.current_team_name(event),
                    event_id: vote.event_id,
                    voter_id: vote.voter_id,
                    voted_at: vote.voted_at,
                }
            })
            .collect();

        Ok(Dashboard {
            stats,
            recent_events: owned.into_iter().take(DASHBOARD_RECENT_EVENTS).collect(),
            recent_votes,
        })
    }

    async fn load(&self, id: EventId) -> Result<Event, GatewayError> {
        self.retry
            .run("get_event", || self.store.get_event(id))
            .await?
            .ok_or(GatewayError::EventNotFound(id))
    }
}
