//! Room — one active canvas and the live connections attached to it.
//!
//! DESIGN
//! ======
//! A `Room` owns the grid, presence, access gate, chat log and broadcast
//! router for one name. Every method runs under the registry's per-room
//! lock, so each call is one atomic step of the room's serialized event
//! stream. Nothing here awaits.
//!
//! Replies meant only for the calling connection are returned to the
//! caller; everything peers must see goes through the router.
//!
//! PERSISTENCE
//! ===========
//! Every accepted mutation (draw, undo, access change, expand) bumps a
//! revision counter. [`Room::pending_save`] captures a [`RoomRecord`] with
//! the revision it reflects, and [`Room::mark_saved`] records that revision
//! once the write lands. A save that fails or is overtaken simply leaves the
//! room dirty. Chat is never persisted.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::access::{AccessError, AccessGate};
use super::chat::{self, ChatEntry, ChatLog};
use super::draw::{self, DrawRejection, Stroke, UndoStack};
use super::grid::{Grid, GridError, MAX_EXPAND};
use super::identity::{Identity, Profile};
use super::name::RoomName;
use super::presence::{Arrival, Departure, Presence};
use super::router::Router;
use crate::config::CanvasConfig;
use crate::event::{ConnectedUser, ServerEvent, now_ms};

// =============================================================================
// TYPES
// =============================================================================

/// A room as persistence stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub name: RoomName,
    pub owner_id: Option<Uuid>,
    /// Row-major: `grid[y][x]`.
    pub grid: Vec<Vec<u8>>,
    pub placer: Vec<Vec<Option<Uuid>>>,
    pub authorized_ids: Vec<Uuid>,
}

impl RoomRecord {
    /// A freshly provisioned room: square, all white, nobody placed
    /// anything, and only the owner may draw.
    #[must_use]
    pub fn blank(name: RoomName, owner_id: Uuid, config: &CanvasConfig) -> Self {
        let size = config.default_grid_size;
        let white = super::grid::blank_color(config.palette_size);
        Self {
            name,
            owner_id: Some(owner_id),
            grid: vec![vec![white; size]; size],
            placer: vec![vec![None; size]; size],
            authorized_ids: vec![owner_id],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExpandRejection {
    #[error("only the room owner may expand the canvas")]
    NotOwner,
    #[error("expand amount must be between 1 and 100")]
    InvalidAmount,
}

pub struct Room {
    name: RoomName,
    grid: Grid,
    gate: AccessGate,
    presence: Presence,
    router: Router,
    chat: ChatLog,
    max_message_chars: usize,
    revision: u64,
    saved_revision: u64,
}

impl Room {
    /// Activate a persisted room.
    ///
    /// `profiles` resolves placer ids to contributor profiles; ids it does
    /// not cover become [`Profile::unknown`].
    ///
    /// # Errors
    ///
    /// Returns `GridError` if the stored grid and placer layout are not a
    /// valid grid for the configured palette.
    pub fn from_record(
        record: RoomRecord,
        profiles: &HashMap<Uuid, Profile>,
        config: &CanvasConfig,
    ) -> Result<Self, GridError> {
        let grid = Grid::from_rows(record.grid, record.placer, profiles, config.palette_size)?;
        Ok(Self {
            name: record.name,
            grid,
            gate: AccessGate::new(record.owner_id, record.authorized_ids),
            presence: Presence::new(),
            router: Router::new(),
            chat: ChatLog::new(config.chat_log_limit),
            max_message_chars: config.chat_message_max_chars,
            revision: 0,
            saved_revision: 0,
        })
    }

    #[must_use]
    pub fn to_record(&self) -> RoomRecord {
        let snapshot = self.grid.snapshot();
        RoomRecord {
            name: self.name.clone(),
            owner_id: self.gate.owner_id(),
            grid: snapshot.grid,
            placer: snapshot.placer,
            authorized_ids: self.gate.authorized_ids(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    /// Distinct identities present.
    #[must_use]
    pub fn presence_count(&self) -> usize {
        self.presence.count()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.router.connection_count()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// What needs saving, with the revision it reflects. `None` when the
    /// store is already up to date.
    #[must_use]
    pub fn pending_save(&self) -> Option<(RoomRecord, u64)> {
        self.is_dirty().then(|| (self.to_record(), self.revision))
    }

    /// Record that `revision` has been persisted.
    pub fn mark_saved(&mut self, revision: u64) {
        self.saved_revision = self.saved_revision.max(revision);
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    /// Full canvas state as seen by `viewer` (`None` for anonymous).
    #[must_use]
    pub fn load_data_for(&self, viewer: Option<Uuid>) -> ServerEvent {
        ServerEvent::LoadData {
            room: self.name.clone(),
            snapshot: self.grid.snapshot(),
            contributors: self.grid.contributors(),
            is_owner: viewer.is_some_and(|id| self.gate.is_owner(id)),
            is_authorized: viewer.is_some_and(|id| self.gate.is_authorized(id)),
        }
    }

    #[must_use]
    pub fn connected_users(&self) -> ServerEvent {
        let users = self
            .presence
            .profiles()
            .into_iter()
            .map(|profile| ConnectedUser {
                profile: profile.clone(),
                is_authorized: self.gate.is_authorized(profile.id),
                is_owner: self.gate.is_owner(profile.id),
            })
            .collect();
        ServerEvent::ConnectedUsers { users }
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Register a connection and return what it needs to render the room.
    ///
    /// An identity's first connection announces the new roster to the whole
    /// room; a further tab of an already present identity only gets the
    /// roster itself.
    pub fn admit(&mut self, client_id: Uuid, identity: &Identity, tx: mpsc::Sender<ServerEvent>) -> Vec<ServerEvent> {
        let arrival = self.presence.join(client_id, &identity.profile);
        self.router.subscribe(client_id, identity.id(), tx);

        let mut replies = vec![
            self.load_data_for(Some(identity.id())),
            ServerEvent::LoadMessages { messages: self.chat.entries() },
        ];
        match arrival {
            Arrival::Entered => {
                self.router.to_room(&self.connected_users(), None);
            }
            Arrival::AlreadyPresent => replies.push(self.connected_users()),
        }
        replies
    }

    /// Fresh render state for a connection that is already admitted. The
    /// roster is unchanged, so peers hear nothing.
    #[must_use]
    pub fn refresh(&self, identity_id: Uuid) -> Vec<ServerEvent> {
        vec![
            self.load_data_for(Some(identity_id)),
            ServerEvent::LoadMessages { messages: self.chat.entries() },
            self.connected_users(),
        ]
    }

    /// Detach a connection. Peers hear about it only when it was the
    /// identity's last one.
    pub fn depart(&mut self, client_id: Uuid, identity_id: Uuid) -> Departure {
        self.router.unsubscribe(client_id);
        let departure = self.presence.leave(identity_id, client_id);
        if departure == Departure::Left && self.presence.count() > 0 {
            self.router.to_room(&self.connected_users(), None);
        }
        departure
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Apply a stroke and relay it to every other connection.
    ///
    /// # Errors
    ///
    /// Returns the `DrawRejection` from the draw engine; the room is left
    /// untouched and nothing is broadcast.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        stroke: Stroke,
        client_id: Uuid,
        actor: &Profile,
        undo: &mut UndoStack,
        x: u32,
        y: u32,
        color: u8,
    ) -> Result<(), DrawRejection> {
        let event = draw::apply(stroke, &mut self.grid, &self.gate, actor, undo, x, y, color)?;
        self.touch();
        self.router.to_room(&event, Some(client_id));
        Ok(())
    }

    /// Revert the connection's newest stroke. Restored cells go to every
    /// connection in the room, the requester included, since only the
    /// server knows what each cell held before. Returns the number of
    /// restored cells.
    pub fn undo(&mut self, stack: &mut UndoStack) -> usize {
        let events = draw::undo(&mut self.grid, stack);
        if !events.is_empty() {
            self.touch();
        }
        for event in &events {
            self.router.to_room(event, None);
        }
        events.len()
    }

    /// # Errors
    ///
    /// Returns `AccessError` when the gate refuses the change.
    pub fn authorize(&mut self, requestor: Uuid, target: Uuid) -> Result<(), AccessError> {
        self.gate.authorize(requestor, target, self.presence.contains(target))?;
        self.after_access_change(target, &ServerEvent::UserAuthorized);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AccessError` when the gate refuses the change.
    pub fn deauthorize(&mut self, requestor: Uuid, target: Uuid) -> Result<(), AccessError> {
        self.gate.deauthorize(requestor, target, self.presence.contains(target))?;
        self.after_access_change(target, &ServerEvent::UserDeauthorized);
        Ok(())
    }

    fn after_access_change(&mut self, target: Uuid, notice: &ServerEvent) {
        self.touch();
        self.router.to_room(&self.connected_users(), None);
        let reached = self.router.to_identity(target, notice);
        debug!(room = %self.name, %target, reached, event = notice.name(), "access changed");
    }

    /// Append a chat line from a present identity and relay it to every
    /// other connection. Returns whether the message was accepted.
    pub fn post_message(&mut self, client_id: Uuid, user: &Profile, text: &str) -> bool {
        if !self.presence.contains(user.id) {
            return false;
        }
        let Some(text) = chat::sanitize(text, self.max_message_chars) else {
            return false;
        };
        let entry = ChatEntry { user: user.clone(), text, ts: now_ms() };
        self.router.to_room(
            &ServerEvent::ReceiveMessage { user: entry.user.clone(), text: entry.text.clone(), ts: entry.ts },
            Some(client_id),
        );
        self.chat.push(entry);
        true
    }

    /// Grow the canvas on both axes. Owner only.
    ///
    /// # Errors
    ///
    /// Returns `ExpandRejection` for a non-owner or an amount outside
    /// `1..=MAX_EXPAND`.
    pub fn expand(&mut self, requestor: Uuid, amount: u32) -> Result<(), ExpandRejection> {
        if !self.gate.is_owner(requestor) {
            return Err(ExpandRejection::NotOwner);
        }
        if amount == 0 || amount > MAX_EXPAND {
            return Err(ExpandRejection::InvalidAmount);
        }
        self.grid.expand(amount as usize);
        self.touch();
        self.router.to_room(
            &ServerEvent::GridExpanded { amount, width: self.grid.width(), height: self.grid.height() },
            None,
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
