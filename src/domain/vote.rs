//! Vote ledger rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Event, EventId, Team, TeamId, VoteId, VoterId};

/// Request metadata recorded alongside a vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoteMetadata {
    /// Origin address as reported by the fronting proxy.
    pub ip_address: Option<String>,
    /// Client user-agent string.
    pub user_agent: Option<String>,
}

/// One voter's immutable choice of team within one event.
///
/// At most one `Vote` exists per `(event_id, voter_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Vote {
    /// Ledger row identifier.
    pub id: VoteId,
    /// Event voted in.
    pub event_id: EventId,
    /// Voter who cast the vote.
    pub voter_id: VoterId,
    /// Chosen team.
    pub team_id: TeamId,
    /// Team name at admission time, for display.
    pub team_name: String,
    /// Admission timestamp.
    pub voted_at: DateTime<Utc>,
    /// Submission metadata.
    #[serde(flatten)]
    pub metadata: VoteMetadata,
}

impl Vote {
    /// Builds a new, not yet persisted vote for `team`.
    #[must_use]
    pub fn new(
        event_id: EventId,
        voter_id: VoterId,
        team: &Team,
        metadata: VoteMetadata,
        voted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VoteId::new(),
            event_id,
            voter_id,
            team_id: team.id,
            team_name: team.name.clone(),
            voted_at,
            metadata,
        }
    }

    /// Name of the chosen team as `event` lists it now, or the admission
    /// snapshot when the team (or the event) is gone.
    #[must_use]
    pub fn current_team_name(&self, event: Option<&Event>) -> String {
        event
            .and_then(|e| e.team(self.team_id))
            .map_or_else(|| self.team_name.clone(), |t| t.name.clone())
    }
}
