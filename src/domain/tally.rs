//! Read-time vote aggregation.
//!
//! Tallies are always recomputed from the vote ledger. The event's
//! denormalized `total_votes` counter is never consulted here.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::{Event, EventId, TeamId, Vote};

/// Per-team row of a tally.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TeamTally {
    /// Team identifier.
    pub team_id: TeamId,
    /// Current team name.
    pub name: String,
    /// Number of votes for the team.
    pub votes: u64,
    /// Share of all votes, rounded to two decimals; `0` when nobody voted.
    pub percentage: f64,
    /// Team display color.
    pub color: String,
}

/// Aggregated results for one event.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TallyStats {
    /// Event the tally belongs to.
    pub event_id: EventId,
    /// Number of ledger rows for the event.
    pub total_votes: u64,
    /// One row per team, in the event's team order.
    pub teams: Vec<TeamTally>,
}

impl TallyStats {
    /// Groups `votes` by team and derives counts and percentages.
    ///
    /// Every team of `event` gets a row, including teams with no votes.
    /// Votes belonging to other events are ignored.
    #[must_use]
    pub fn compute(event: &Event, votes: &[Vote]) -> Self {
        let mut counts: HashMap<TeamId, u64> = HashMap::with_capacity(event.teams.len());
        let mut total: u64 = 0;
        for vote in votes.iter().filter(|v| v.event_id == event.id) {
            *counts.entry(vote.team_id).or_insert(0) += 1;
            total += 1;
        }

        let teams = event
            .teams
            .iter()
            .map(|team| {
                let votes = counts.get(&team.id).copied().unwrap_or(0);
                TeamTally {
                    team_id: team.id,
                    name: team.name.clone(),
                    votes,
                    percentage: percentage(votes, total),
                    color: team.color.clone(),
                }
            })
            .collect();

        Self {
            event_id: event.id,
            total_votes: total,
            teams,
        }
    }
}

/// `round(votes / total * 100, 2)`, or `0` when `total` is zero.
#[allow(clippy::cast_precision_loss)]
fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 / total as f64 * 10_000.0).round() / 100.0
}
