//! Change notifications published after state mutations.
//!
//! Notifications carry just enough for a viewer to decide whether to
//! re-fetch. Consumers never apply them as deltas.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::EventId;

/// Notification emitted through the [`super::EventBus`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum VoteNotification {
    /// A vote was admitted.
    VoteCast {
        /// Event voted in.
        event_id: EventId,
        /// Name of the chosen team.
        team_name: String,
        /// Event's vote counter after the admission.
        total_votes: u64,
        /// Admission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An event was created.
    EventCreated {
        /// New event.
        event_id: EventId,
        /// Event name.
        name: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An event's fields changed.
    EventUpdated {
        /// Updated event.
        event_id: EventId,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An event and its votes were deleted.
    EventDeleted {
        /// Deleted event.
        event_id: EventId,
        /// Deletion timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl VoteNotification {
    /// Returns the event this notification is scoped to.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::VoteCast { event_id, .. }
            | Self::EventCreated { event_id, .. }
            | Self::EventUpdated { event_id, .. }
            | Self::EventDeleted { event_id, .. } => *event_id,
        }
    }

    /// Returns the notification type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::VoteCast { .. } => "vote_cast",
            Self::EventCreated { .. } => "event_created",
            Self::EventUpdated { .. } => "event_updated",
            Self::EventDeleted { .. } => "event_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_cast_serializes_with_tag() {
        let event = VoteNotification::VoteCast {
            event_id: EventId::new(),
            team_name: "Red".to_string(),
            total_votes: 12,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["event_type"], "vote_cast");
        assert_eq!(json["team_name"], "Red");
        assert_eq!(json["total_votes"], 12);
    }

    #[test]
    fn event_id_accessor() {
        let id = EventId::new();
        let event = VoteNotification::EventDeleted {
            event_id: id,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_id(), id);
        assert_eq!(event.event_type_str(), "event_deleted");
    }
}
