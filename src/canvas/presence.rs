//! Presence tracker — who is in the room, by identity rather than by socket.
//!
//! One identity may hold several connections (tabs, devices). The tracker
//! keeps both views: `connections` maps each live connection to its
//! identity, `connected` holds one profile per identity. An identity enters
//! on its first connection and leaves only when its last one closes.

use std::collections::HashMap;

use uuid::Uuid;

use super::identity::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// First connection of this identity in the room.
    Entered,
    /// Another connection of an identity that was already present.
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The identity's last connection closed.
    Left,
    /// Other connections of the identity remain.
    StillPresent,
    /// The connection was not registered.
    Unknown,
}

#[derive(Debug, Default)]
pub struct Presence {
    connections: HashMap<Uuid, Uuid>,
    connected: HashMap<Uuid, Profile>,
}

impl Presence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, client_id: Uuid, profile: &Profile) -> Arrival {
        self.connections.insert(client_id, profile.id);
        if self.connected.contains_key(&profile.id) {
            return Arrival::AlreadyPresent;
        }
        self.connected.insert(profile.id, profile.clone());
        Arrival::Entered
    }

    pub fn leave(&mut self, identity_id: Uuid, client_id: Uuid) -> Departure {
        if self.connections.remove(&client_id).is_none() {
            return Departure::Unknown;
        }
        // Linear scan over the room's connections; rooms are small.
        if self.connections.values().any(|id| *id == identity_id) {
            return Departure::StillPresent;
        }
        self.connected.remove(&identity_id);
        Departure::Left
    }

    /// Distinct identities present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connected.len()
    }

    /// Live connections, across all identities.
    #[must_use]
    #[cfg(test)]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn contains(&self, identity_id: Uuid) -> bool {
        self.connected.contains_key(&identity_id)
    }

    /// Present identities, sorted by display name.
    #[must_use]
    pub fn profiles(&self) -> Vec<&Profile> {
        let mut out: Vec<&Profile> = self.connected.values().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        out
    }
}
