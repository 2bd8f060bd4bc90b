//! In-process store guarded by a single [`tokio::sync::RwLock`].
//!
//! All tables live behind one lock so that the vote insert, the
//! uniqueness check, and the counter increment happen in a single
//! critical section, the in-memory analogue of a unique index plus a
//! same-transaction update.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{EventUpdate, StoreError, VoteInsert, VoteStore};
use crate::domain::{AdminId, Event, EventId, TeamId, Vote, VoteId, Voter, VoterId, VoterLogin};

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    slugs: HashMap<String, EventId>,
    votes: HashMap<VoteId, Vote>,
    /// Unique index over `(event, voter)`.
    vote_pairs: HashMap<(EventId, VoterId), VoteId>,
    voters: HashMap<VoterId, Voter>,
    voter_keys: HashMap<String, VoterId>,
}

impl Tables {
    fn votes_where(&self, pred: impl Fn(&Vote) -> bool) -> Vec<Vote> {
        self.votes.values().filter(|v| pred(v)).cloned().collect()
    }
}

/// In-memory [`VoteStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(StoreError::Conflict(format!(
                "event {} already exists",
                event.id
            )));
        }
        if tables.slugs.contains_key(&event.voting_slug) {
            return Err(StoreError::Conflict("voting slug already in use".to_string()));
        }
        tables.slugs.insert(event.voting_slug.clone(), event.id);
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn get_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .slugs
            .get(slug)
            .and_then(|id| tables.events.get(id))
            .cloned())
    }

    async fn list_events_by_owner(&self, owner: AdminId) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.created_by == owner)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn list_open_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.is_open(now))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.end_date.cmp(&b.end_date));
        Ok(events)
    }

    async fn update_event(&self, event: &Event) -> Result<EventUpdate, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event.id) {
            return Ok(EventUpdate::Missing);
        }

        let kept: HashSet<TeamId> = event.teams.iter().map(|t| t.id).collect();
        if let Some(orphan) = tables
            .votes
            .values()
            .find(|v| v.event_id == event.id && !kept.contains(&v.team_id))
        {
            return Ok(EventUpdate::TeamHasVotes(orphan.team_id));
        }

        let Some(stored) = tables.events.get_mut(&event.id) else {
            return Ok(EventUpdate::Missing);
        };
        let total_votes = stored.total_votes;
        *stored = Event {
            total_votes,
            ..event.clone()
        };
        Ok(EventUpdate::Updated)
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.remove(&id) else {
            return Ok(false);
        };
        tables.slugs.remove(&event.voting_slug);

        let doomed: Vec<(VoteId, VoterId)> = tables
            .votes
            .values()
            .filter(|v| v.event_id == id)
            .map(|v| (v.id, v.voter_id))
            .collect();
        for (vote_id, voter_id) in doomed {
            tables.votes.remove(&vote_id);
            tables.vote_pairs.remove(&(id, voter_id));
        }
        Ok(true)
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<VoteInsert, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(event) = tables.events.get(&vote.event_id) else {
            return Err(StoreError::Backend(format!(
                "vote references missing event {}",
                vote.event_id
            )));
        };
        if event.team(vote.team_id).is_none() {
            return Ok(VoteInsert::TeamUnavailable);
        }

        let pair = (vote.event_id, vote.voter_id);
        if let Some(existing) = tables
            .vote_pairs
            .get(&pair)
            .and_then(|id| tables.votes.get(id))
        {
            return Ok(VoteInsert::Duplicate(existing.clone()));
        }

        let Some(event) = tables.events.get_mut(&vote.event_id) else {
            return Err(StoreError::Backend(format!(
                "vote references missing event {}",
                vote.event_id
            )));
        };
        event.total_votes = event.total_votes.saturating_add(1);
        let total_votes = event.total_votes;

        if let Some(voter) = tables.voters.get_mut(&vote.voter_id) {
            voter.last_vote_at = Some(vote.voted_at);
        }
        tables.vote_pairs.insert(pair, vote.id);
        tables.votes.insert(vote.id, vote.clone());

        Ok(VoteInsert::Inserted { total_votes })
    }

    async fn find_vote(
        &self,
        event: EventId,
        voter: VoterId,
    ) -> Result<Option<Vote>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .vote_pairs
            .get(&(event, voter))
            .and_then(|id| tables.votes.get(id))
            .cloned())
    }

    async fn votes_for_event(&self, event: EventId) -> Result<Vec<Vote>, StoreError> {
        let mut votes = self.tables.read().await.votes_where(|v| v.event_id == event);
        votes.sort_by(|a, b| a.voted_at.cmp(&b.voted_at));
        Ok(votes)
    }

    async fn votes_by_voter(&self, voter: VoterId) -> Result<Vec<Vote>, StoreError> {
        let mut votes = self.tables.read().await.votes_where(|v| v.voter_id == voter);
        votes.sort_by(|a, b| b.voted_at.cmp(&a.voted_at));
        Ok(votes)
    }

    async fn recent_votes(&self, limit: usize) -> Result<Vec<Vote>, StoreError> {
        let mut votes = self.tables.read().await.votes_where(|_| true);
        votes.sort_by(|a, b| b.voted_at.cmp(&a.voted_at));
        votes.truncate(limit);
        Ok(votes)
    }

    async fn count_votes(&self) -> Result<u64, StoreError> {
        Ok(self.tables.read().await.votes.len() as u64)
    }

    async fn upsert_voter(&self, login: &VoterLogin) -> Result<Voter, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(voter) = tables
            .voter_keys
            .get(&login.identity_key)
            .and_then(|id| tables.voters.get(id))
        {
            return Ok(voter.clone());
        }

        let voter = Voter {
            id: VoterId::new(),
            name: login.name.clone(),
            email: login.email.clone(),
            identity_key: login.identity_key.clone(),
            is_verified: login.verified_on_create,
            last_vote_at: None,
            created_at: Utc::now(),
        };
        tables.voter_keys.insert(voter.identity_key.clone(), voter.id);
        tables.voters.insert(voter.id, voter.clone());
        Ok(voter)
    }

    async fn get_voter(&self, id: VoterId) -> Result<Option<Voter>, StoreError> {
        Ok(self.tables.read().await.voters.get(&id).cloned())
    }

    async fn get_voters(&self, ids: &HashSet<VoterId>) -> Result<Vec<Voter>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.voters.get(id))
            .cloned()
            .collect())
    }

    async fn list_voters(&self) -> Result<Vec<Voter>, StoreError> {
        let mut voters: Vec<Voter> = self.tables.read().await.voters.values().cloned().collect();
        voters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(voters)
    }

    async fn set_voter_verified(
        &self,
        id: VoterId,
        verified: bool,
    ) -> Result<Option<Voter>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.voters.get_mut(&id).map(|voter| {
            voter.is_verified = verified;
            voter.clone()
        }))
    }
}
