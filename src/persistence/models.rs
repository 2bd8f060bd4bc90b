//! Database row models and their conversions into domain types.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::StoreError;
use crate::domain::{
    AdminId, Event, EventId, Team, TeamId, Vote, VoteId, VoteMetadata, Voter, VoterId,
};

/// A row from the `events` table. Teams are stored as JSONB.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique public token.
    pub voting_slug: String,
    /// Event name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Embedded team list.
    pub teams: Json<Vec<Team>>,
    /// Window start.
    pub start_date: DateTime<Utc>,
    /// Window end.
    pub end_date: DateTime<Utc>,
    /// Kill switch.
    pub is_active: bool,
    /// Denormalized vote counter.
    pub total_votes: i64,
    /// Owning administrator.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::from_uuid(row.id),
            voting_slug: row.voting_slug,
            name: row.name,
            description: row.description,
            teams: row.teams.0,
            start_date: row.start_date,
            end_date: row.end_date,
            is_active: row.is_active,
            total_votes: count_from_db(row.total_votes)?,
            created_by: AdminId::from_uuid(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Reads a `BIGINT` counter; a negative value means a corrupt row.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if `value` is negative.
pub fn count_from_db(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Backend(format!("negative counter {value}")))
}

/// Converts a counter or limit to `BIGINT`.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if `value` exceeds `i64::MAX`.
pub fn count_to_db<T>(value: T) -> Result<i64, StoreError>
where
    T: Copy + std::fmt::Display + TryInto<i64>,
{
    value
        .try_into()
        .map_err(|_| StoreError::Backend(format!("counter {value} out of BIGINT range")))
}

/// A row from the `votes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteRow {
    /// Primary key.
    pub id: Uuid,
    /// Event reference.
    pub event_id: Uuid,
    /// Voter reference.
    pub voter_id: Uuid,
    /// Chosen team id.
    pub team_id: Uuid,
    /// Team name at admission time.
    pub team_name: String,
    /// Admission timestamp.
    pub voted_at: DateTime<Utc>,
    /// Origin address.
    pub ip_address: Option<String>,
    /// Client user-agent.
    pub user_agent: Option<String>,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Self {
            id: VoteId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            voter_id: VoterId::from_uuid(row.voter_id),
            team_id: TeamId::from_uuid(row.team_id),
            team_name: row.team_name,
            voted_at: row.voted_at,
            metadata: VoteMetadata {
                ip_address: row.ip_address,
                user_agent: row.user_agent,
            },
        }
    }
}

/// A row from the `voters` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoterRow {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Unique login key.
    pub identity_key: String,
    /// Verification flag.
    pub is_verified: bool,
    /// Most recent admitted vote.
    pub last_vote_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<VoterRow> for Voter {
    fn from(row: VoterRow) -> Self {
        Self {
            id: VoterId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            identity_key: row.identity_key,
            is_verified: row.is_verified,
            last_vote_at: row.last_vote_at,
            created_at: row.created_at,
        }
    }
}
