//! Room provisioning — creating a new named canvas for its owner.
//!
//! DESIGN
//! ======
//! A user owns at most one room. Creation writes a blank record straight to
//! the store; the room only becomes active when someone joins it. The store
//! enforces both uniqueness rules (`rooms.name` primary key and
//! `rooms.owner_id` unique), so two racing creates cannot both win.

use tracing::info;

use super::store::{RoomStore, StoreError};
use crate::canvas::identity::Identity;
use crate::canvas::name::{NameError, RoomName};
use crate::canvas::room::RoomRecord;
use crate::config::CanvasConfig;
use crate::event::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum CreateRoomError {
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("you already own a room")]
    AlreadyOwner,
    #[error("room name is taken: {0}")]
    NameTaken(RoomName),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for CreateRoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "E_INVALID_ROOM_NAME",
            Self::AlreadyOwner => "E_ALREADY_OWNER",
            Self::NameTaken(_) => "E_ROOM_NAME_TAKEN",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

/// Create a blank room named `raw_name`, owned by `owner`.
///
/// # Errors
///
/// Returns [`CreateRoomError`] when the name is invalid or taken, when the
/// owner already has a room, or when the store fails.
pub async fn create_room(
    store: &dyn RoomStore,
    owner: &Identity,
    raw_name: &str,
    config: &CanvasConfig,
) -> Result<RoomName, CreateRoomError> {
    let name = RoomName::parse_new(raw_name)?;
    if owner.owned_room.is_some() {
        return Err(CreateRoomError::AlreadyOwner);
    }

    let record = RoomRecord::blank(name.clone(), owner.id(), config);
    if store.create_room(&record).await? {
        info!(room = %name, owner_id = %owner.id(), "created room");
        return Ok(name);
    }

    // Refused: either the name exists or this owner won a concurrent create.
    if store.load_room(&name).await?.is_some() {
        Err(CreateRoomError::NameTaken(name))
    } else {
        Err(CreateRoomError::AlreadyOwner)
    }
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
