//! Vote DTOs: casting, status, and history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventId, TeamId, Vote, VoteId};
use crate::service::{HistoryEntry, OpenEvent};

/// Request body for `POST /voter/events/{id}/vote`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CastVoteRequest {
    /// Exact name of the chosen team.
    pub team: String,
}

/// Response body for an admitted vote (201 Created).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CastVoteResponse {
    /// Ledger id of the vote.
    pub vote_id: VoteId,
    /// Event voted in.
    pub event_id: EventId,
    /// Chosen team id.
    pub team_id: TeamId,
    /// Chosen team name.
    pub team: String,
    /// Admission time.
    pub voted_at: DateTime<Utc>,
}

impl From<Vote> for CastVoteResponse {
    fn from(vote: Vote) -> Self {
        Self {
            vote_id: vote.id,
            event_id: vote.event_id,
            team_id: vote.team_id,
            team: vote.team_name,
            voted_at: vote.voted_at,
        }
    }
}

/// Response body for `GET /voter/events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct OpenEventListResponse {
    /// Open events annotated with `has_voted`.
    pub data: Vec<OpenEvent>,
}

/// Response body for `GET /voter/history`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    /// Votes, newest first.
    pub data: Vec<HistoryEntry>,
}
