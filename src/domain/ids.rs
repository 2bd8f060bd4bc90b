//! Type-safe identifiers.
//!
//! Every entity gets its own newtype wrapper around [`uuid::Uuid`] (v4) so
//! that an event id can never be passed where a voter id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<uuid::Uuid>().map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of a voting event.
    ///
    /// Internal only; anonymous visitors reach an event through its
    /// voting slug instead.
    EventId
);

uuid_id!(
    /// Unique identifier of a voter account.
    VoterId
);

uuid_id!(
    /// Reference to the administrator owning an event.
    AdminId
);

uuid_id!(
    /// Stable identifier of a team within an event.
    ///
    /// Votes reference teams by this id, so renaming a team never orphans
    /// existing votes.
    TeamId
);

uuid_id!(
    /// Unique identifier of a single vote in the ledger.
    VoteId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_uuid_format() {
        let id = VoterId::new();
        let s = format!("{id}");
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn serializes_as_plain_uuid_string() {
        let uuid = uuid::Uuid::new_v4();
        let id = TeamId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn parses_from_str() {
        let uuid = uuid::Uuid::new_v4();
        let Ok(id) = uuid.to_string().parse::<AdminId>() else {
            panic!("valid uuid must parse");
        };
        assert_eq!(*id.as_uuid(), uuid);
        assert!("not-a-uuid".parse::<AdminId>().is_err());
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = VoteId::new();
        let mut map = HashMap::new();
        map.insert(id, "vote");
        assert_eq!(map.get(&id), Some(&"vote"));
    }
}
