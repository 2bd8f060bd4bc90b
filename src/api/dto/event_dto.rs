//! Event DTOs for admin management and public discovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{Event, EventId, EventPatch, NewEvent, TallyStats, Team, TeamId, TeamSpec};

/// A team as sent by an administrator.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TeamInput {
    /// Existing team id, to keep the team's identity across a rename.
    #[serde(default)]
    pub id: Option<TeamId>,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Display color; defaults to `#3B82F6`.
    #[serde(default)]
    pub color: Option<String>,
}

impl From<TeamInput> for TeamSpec {
    fn from(input: TeamInput) -> Self {
        Self {
            id: input.id,
            name: input.name,
            description: input.description,
            color: input.color,
        }
    }
}

/// Request body for `POST /admin/events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Event name (at least 3 characters).
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// At least two teams with unique names.
    pub teams: Vec<TeamInput>,
    /// Voting window start.
    pub start_date: DateTime<Utc>,
    /// Voting window end; must be after `start_date`.
    pub end_date: DateTime<Utc>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            teams: req.teams.into_iter().map(TeamSpec::from).collect(),
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

/// Request body for `PUT /admin/events/{id}`. Absent fields are unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement team list.
    #[serde(default)]
    pub teams: Option<Vec<TeamInput>>,
    /// New window start.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// New window end.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// New kill-switch value.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            teams: req
                .teams
                .map(|teams| teams.into_iter().map(TeamSpec::from).collect()),
            start_date: req.start_date,
            end_date: req.end_date,
            is_active: req.is_active,
        }
    }
}

/// Request body for `PATCH /admin/events/{id}/active`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    /// New kill-switch value.
    pub is_active: bool,
}

/// Response body for `GET /admin/events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events on this page.
    pub data: Vec<Event>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Public view of an event, without ownership data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicEventDto {
    /// Event id.
    pub id: EventId,
    /// Voting slug.
    pub voting_slug: String,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Teams in display order.
    pub teams: Vec<Team>,
    /// Window start.
    pub start_date: DateTime<Utc>,
    /// Window end.
    pub end_date: DateTime<Utc>,
    /// Whether voting is open right now.
    pub is_open: bool,
}

impl From<&Event> for PublicEventDto {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            voting_slug: event.voting_slug.clone(),
            name: event.name.clone(),
            description: event.description.clone(),
            teams: event.teams.clone(),
            start_date: event.start_date,
            end_date: event.end_date,
            is_open: event.is_open(Utc::now()),
        }
    }
}

/// Response body for `GET /public/events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicEventListResponse {
    /// Open events, ending soonest first.
    pub data: Vec<PublicEventDto>,
}

/// Response body for `GET /public/events/{slug}/results`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicResultsResponse {
    /// The event.
    pub event: PublicEventDto,
    /// Its tally.
    pub stats: TallyStats,
}
