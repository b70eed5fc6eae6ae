//! Identity fields cached per connection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::name::RoomName;

/// The public face of a user: what peers see next to a placed cell or in the
/// connected-users list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

impl Profile {
    /// Stand-in for a placer id the identity lookup no longer knows about.
    #[must_use]
    pub fn unknown(id: Uuid) -> Self {
        Self { id, name: "unknown".into(), avatar: None }
    }
}

/// An authenticated user as seen by one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub profile: Profile,
    /// Name of the room this user created, if any.
    pub owned_room: Option<RoomName>,
}

impl Identity {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.profile.id
    }
}
