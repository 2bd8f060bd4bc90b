//! Voting events and their embedded team lists.
//!
//! An [`Event`] owns its [`Team`]s; teams have no lifecycle of their own.
//! Construction and updates go through [`Event::create`] and
//! [`Event::apply_patch`], which enforce the schedule and team-list
//! invariants.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AdminId, EventId, TeamId};
use crate::error::GatewayError;

/// Color assigned to teams created without one.
pub const DEFAULT_TEAM_COLOR: &str = "#3B82F6";

/// Minimum number of teams in an event.
pub const MIN_TEAMS: usize = 2;

/// Minimum length of a trimmed event name.
pub const MIN_EVENT_NAME_LEN: usize = 3;

/// Random bytes behind a voting slug (hex-encoded to twice this length).
const SLUG_BYTES: usize = 16;

/// A selectable option within an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Team {
    /// Stable identifier, assigned at creation.
    pub id: TeamId,
    /// Display name, unique within the event (case-sensitive).
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Display color used by result charts.
    pub color: String,
}

/// Team as supplied by an administrator on create or update.
///
/// On update, a team spec carrying the `id` of an existing team edits that team
/// in place; a team spec without `id` adds a new team.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TeamSpec {
    /// Existing team to edit (updates only).
    #[serde(default)]
    pub id: Option<TeamId>,
    /// Team name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional color; defaults to [`DEFAULT_TEAM_COLOR`].
    #[serde(default)]
    pub color: Option<String>,
}

impl TeamSpec {
    /// Shorthand for a new team with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Input for [`Event::create`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewEvent {
    /// Event name (at least three characters once trimmed).
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// At least two teams with unique, non-empty names.
    pub teams: Vec<TeamSpec>,
    /// Start of the voting window.
    pub start_date: DateTime<Utc>,
    /// End of the voting window; must be after `start_date`.
    pub end_date: DateTime<Utc>,
}

/// Partial update applied by [`Event::apply_patch`]. Absent fields are left
/// untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EventPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description; an empty string clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement team list.
    #[serde(default)]
    pub teams: Option<Vec<TeamSpec>>,
    /// New window start.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// New window end.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// New value of the admin kill switch.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// A scheduled voting contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Internal identifier.
    pub id: EventId,
    /// Unguessable public token for anonymous access.
    pub voting_slug: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Ordered team list (at least two).
    pub teams: Vec<Team>,
    /// Start of the voting window (inclusive).
    pub start_date: DateTime<Utc>,
    /// End of the voting window (inclusive).
    pub end_date: DateTime<Utc>,
    /// Admin-settable kill switch.
    pub is_active: bool,
    /// Denormalized vote counter. A cache only; tallies come from the ledger.
    pub total_votes: u64,
    /// Owning administrator.
    pub created_by: AdminId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Validates `draft` and builds a new event owned by `owner`, with fresh
    /// team ids and a random voting slug.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the name is too short, the
    /// window is empty or inverted, or the team list is invalid.
    pub fn create(draft: NewEvent, owner: AdminId, now: DateTime<Utc>) -> Result<Self, GatewayError> {
        let name = validate_name(&draft.name)?;
        validate_window(draft.start_date, draft.end_date)?;
        let specs = draft
            .teams
            .into_iter()
            .map(|t| TeamSpec { id: None, ..t })
            .collect();
        let teams = build_teams(specs, &[])?;

        Ok(Self {
            id: EventId::new(),
            voting_slug: generate_slug(),
            name,
            description: normalize_description(draft.description),
            teams,
            start_date: draft.start_date,
            end_date: draft.end_date,
            is_active: true,
            total_votes: 0,
            created_by: owner,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns a copy of this event with `patch` applied and revalidated.
    ///
    /// `voted_teams` lists the teams that already hold votes; those may be
    /// renamed but not removed. The vote counter is carried over untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the merged event breaks an
    /// invariant, references an unknown team id, or drops a voted team.
    pub fn apply_patch(
        &self,
        patch: EventPatch,
        voted_teams: &HashSet<TeamId>,
        now: DateTime<Utc>,
    ) -> Result<Self, GatewayError> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = validate_name(&name)?;
        }
        if let Some(description) = patch.description {
            next.description = normalize_description(Some(description));
        }
        if let Some(specs) = patch.teams {
            let teams = build_teams(specs, &self.teams)?;
            let kept: HashSet<TeamId> = teams.iter().map(|t| t.id).collect();
            if let Some(dropped) = self
                .teams
                .iter()
                .find(|t| voted_teams.contains(&t.id) && !kept.contains(&t.id))
            {
                return Err(GatewayError::Validation(format!(
                    "team '{}' has recorded votes and cannot be removed",
                    dropped.name
                )));
            }
            next.teams = teams;
        }
        if let Some(start) = patch.start_date {
            next.start_date = start;
        }
        if let Some(end) = patch.end_date {
            next.end_date = end;
        }
        validate_window(next.start_date, next.end_date)?;
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }

        next.updated_at = now;
        Ok(next)
    }

    /// `true` when the event is active and `now` lies within
    /// `[start_date, end_date]`. Always recomputed; never cache the result.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    /// Looks up a team by exact (case-sensitive) name.
    #[must_use]
    pub fn team_by_name(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name == name)
    }

    /// Looks up a team by id.
    #[must_use]
    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }
}

/// Generates a voting slug: 16 random bytes from the thread-local CSPRNG,
/// hex-encoded.
#[must_use]
pub fn generate_slug() -> String {
    let mut bytes = [0u8; SLUG_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn validate_name(name: &str) -> Result<String, GatewayError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_EVENT_NAME_LEN {
        return Err(GatewayError::Validation(format!(
            "event name must be at least {MIN_EVENT_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), GatewayError> {
    if end <= start {
        return Err(GatewayError::Validation(
            "end date must be after start date".to_string(),
        ));
    }
    Ok(())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Resolves team specs against the current team list.
fn build_teams(specs: Vec<TeamSpec>, existing: &[Team]) -> Result<Vec<Team>, GatewayError> {
    if specs.len() < MIN_TEAMS {
        return Err(GatewayError::Validation(format!(
            "an event needs at least {MIN_TEAMS} teams"
        )));
    }

    let mut names = HashSet::with_capacity(specs.len());
    let mut ids = HashSet::with_capacity(specs.len());
    let mut teams = Vec::with_capacity(specs.len());

    for input in specs {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(GatewayError::Validation(
                "team names must not be empty".to_string(),
            ));
        }
        if !names.insert(name.clone()) {
            return Err(GatewayError::Validation(format!(
                "duplicate team name '{name}'"
            )));
        }

        let previous = match input.id {
            Some(id) => Some(
                existing
                    .iter()
                    .find(|t| t.id == id)
                    .ok_or_else(|| GatewayError::Validation(format!("unknown team id {id}")))?,
            ),
            None => None,
        };

        let id = previous.map_or_else(TeamId::new, |t| t.id);
        if !ids.insert(id) {
            return Err(GatewayError::Validation(format!(
                "team id {id} listed more than once"
            )));
        }

        let color = input
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .or_else(|| previous.map(|t| t.color.clone()))
            .unwrap_or_else(|| DEFAULT_TEAM_COLOR.to_string());
        let description = match input.description {
            Some(d) => normalize_description(Some(d)),
            None => previous.and_then(|t| t.description.clone()),
        };

        teams.push(Team {
            id,
            name,
            description,
            color,
        });
    }

    Ok(teams)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn draft(teams: &[&str]) -> NewEvent {
        let now = Utc::now();
        NewEvent {
            name: "Finals".to_string(),
            description: Some("  season closer ".to_string()),
            teams: teams.iter().map(|n| TeamSpec::named(*n)).collect(),
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
        }
    }

    fn make_event() -> Event {
        let Ok(event) = Event::create(draft(&["A", "B"]), AdminId::new(), Utc::now()) else {
            panic!("valid event");
        };
        event
    }

    #[test]
    fn create_assigns_ids_slug_and_defaults() {
        let event = make_event();
        assert_eq!(event.voting_slug.len(), SLUG_BYTES * 2);
        assert!(event.voting_slug.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(event.teams.len(), 2);
        assert_ne!(event.teams[0].id, event.teams[1].id);
        assert_eq!(event.teams[0].color, DEFAULT_TEAM_COLOR);
        assert_eq!(event.description.as_deref(), Some("season closer"));
        assert!(event.is_active);
        assert_eq!(event.total_votes, 0);
    }

    #[test]
    fn slugs_differ_between_events() {
        assert_ne!(make_event().voting_slug, make_event().voting_slug);
    }

    #[test]
    fn create_rejects_inverted_window() {
        let mut s = draft(&["A", "B"]);
        s.end_date = s.start_date;
        assert!(matches!(
            Event::create(s, AdminId::new(), Utc::now()),
            Err(GatewayError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_single_team() {
        let result = Event::create(draft(&["A"]), AdminId::new(), Utc::now());
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn create_rejects_duplicate_and_blank_names() {
        let dup = Event::create(draft(&["A", " A "]), AdminId::new(), Utc::now());
        assert!(matches!(dup, Err(GatewayError::Validation(_))));
        let blank = Event::create(draft(&["A", "  "]), AdminId::new(), Utc::now());
        assert!(matches!(blank, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn team_names_are_case_sensitive() {
        let Ok(event) = Event::create(draft(&["a", "A"]), AdminId::new(), Utc::now()) else {
            panic!("case variants are distinct names");
        };
        assert!(event.team_by_name("a").is_some());
        assert!(event.team_by_name("B").is_none());
    }

    #[test]
    fn create_rejects_short_name() {
        let mut s = draft(&["A", "B"]);
        s.name = " ab ".to_string();
        assert!(Event::create(s, AdminId::new(), Utc::now()).is_err());
    }

    #[test]
    fn is_open_respects_flag_and_window() {
        let mut event = make_event();
        let now = Utc::now();
        assert!(event.is_open(now));
        assert!(event.is_open(event.start_date));
        assert!(event.is_open(event.end_date));
        assert!(!event.is_open(event.end_date + Duration::seconds(1)));
        assert!(!event.is_open(event.start_date - Duration::seconds(1)));
        event.is_active = false;
        assert!(!event.is_open(now));
    }

    #[test]
    fn patch_renames_team_in_place() {
        let event = make_event();
        let team_a = event.teams[0].id;
        let patch = EventPatch {
            teams: Some(vec![
                TeamSpec {
                    id: Some(team_a),
                    ..TeamSpec::named("Alpha")
                },
                TeamSpec {
                    id: Some(event.teams[1].id),
                    ..TeamSpec::named("B")
                },
            ]),
            ..EventPatch::default()
        };
        let voted = HashSet::from([team_a]);
        let Ok(next) = event.apply_patch(patch, &voted, Utc::now()) else {
            panic!("rename must succeed");
        };
        assert_eq!(next.team(team_a).map(|t| t.name.as_str()), Some("Alpha"));
        assert_eq!(next.voting_slug, event.voting_slug);
    }

    #[test]
    fn patch_cannot_drop_voted_team() {
        let event = make_event();
        let team_a = event.teams[0].id;
        let patch = EventPatch {
            teams: Some(vec![
                TeamSpec {
                    id: Some(event.teams[1].id),
                    ..TeamSpec::named("B")
                },
                TeamSpec::named("C"),
            ]),
            ..EventPatch::default()
        };
        let result = event.apply_patch(patch, &HashSet::from([team_a]), Utc::now());
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn patch_rejects_unknown_team_id() {
        let event = make_event();
        let patch = EventPatch {
            teams: Some(vec![
                TeamSpec {
                    id: Some(TeamId::new()),
                    ..TeamSpec::named("X")
                },
                TeamSpec::named("Y"),
            ]),
            ..EventPatch::default()
        };
        assert!(event.apply_patch(patch, &HashSet::new(), Utc::now()).is_err());
    }

    #[test]
    fn patch_revalidates_window() {
        let event = make_event();
        let patch = EventPatch {
            end_date: Some(event.start_date - Duration::minutes(5)),
            ..EventPatch::default()
        };
        assert!(event.apply_patch(patch, &HashSet::new(), Utc::now()).is_err());
    }

    #[test]
    fn patch_keeps_vote_counter() {
        let mut event = make_event();
        event.total_votes = 7;
        let patch = EventPatch {
            is_active: Some(false),
            ..EventPatch::default()
        };
        let Ok(next) = event.apply_patch(patch, &HashSet::new(), Utc::now()) else {
            panic!("toggle must succeed");
        };
        assert!(!next.is_active);
        assert_eq!(next.total_votes, 7);
    }
}
