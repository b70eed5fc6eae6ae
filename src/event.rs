//! Events — the closed wire vocabulary between canvas clients and the server.
//!
//! ARCHITECTURE
//! ============
//! Every websocket text message is one JSON object tagged by `event` with a
//! typed `data` payload: `{"event": "pencil-draw", "data": {"x": 1, ...}}`.
//! Inbound messages deserialize into [`ClientEvent`], outbound ones are built
//! as [`ServerEvent`]. There is no free-form payload anywhere on the wire.
//!
//! DESIGN
//! ======
//! - Payload shape is validated by deserialization before dispatch. A
//!   message that matches no variant (unknown tag, negative coordinate,
//!   color index wider than a byte, malformed uuid) never reaches room state.
//! - Structured errors carry a grepable `E_*` code through [`ErrorCode`].

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::chat::ChatEntry;
use crate::canvas::grid::GridSnapshot;
use crate::canvas::identity::Profile;
use crate::canvas::name::RoomName;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error events.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// INBOUND
// =============================================================================

/// Everything a client may ask of the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    Join { room: String },
    PencilDraw { x: u32, y: u32, color: u8 },
    BrushDraw { x: u32, y: u32, color: u8 },
    Undo,
    Authorize { user_id: Uuid },
    Deauthorize { user_id: Uuid },
    SendMessage { text: String },
    Expand { amount: u32 },
}

impl ClientEvent {
    /// Wire tag, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::PencilDraw { .. } => "pencil-draw",
            Self::BrushDraw { .. } => "brush-draw",
            Self::Undo => "undo",
            Self::Authorize { .. } => "authorize",
            Self::Deauthorize { .. } => "deauthorize",
            Self::SendMessage { .. } => "send-message",
            Self::Expand { .. } => "expand",
        }
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// One entry of the `connected-users` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectedUser {
    #[serde(flatten)]
    pub profile: Profile,
    pub is_authorized: bool,
    pub is_owner: bool,
}

/// Everything the server may send to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First event on every socket.
    SessionConnected { client_id: Uuid, user: Option<Profile> },
    /// Full canvas state for a freshly joined connection.
    LoadData {
        room: RoomName,
        #[serde(flatten)]
        snapshot: GridSnapshot,
        contributors: Vec<Profile>,
        is_owner: bool,
        is_authorized: bool,
    },
    LoadMessages { messages: Vec<ChatEntry> },
    PencilDraw { x: u32, y: u32, color: u8, user: Profile },
    /// Anchor cell only; receivers expand to the orthogonal neighbours themselves.
    BrushDraw { x: u32, y: u32, color: u8, user: Profile },
    /// One restored cell. `user` is `None` when nobody had placed it before.
    ReceiveUndo { x: u32, y: u32, color: u8, user: Option<Profile> },
    ConnectedUsers { users: Vec<ConnectedUser> },
    UserAuthorized,
    UserDeauthorized,
    ReceiveMessage { user: Profile, text: String, ts: i64 },
    GridExpanded { amount: u32, width: usize, height: usize },
    RoomNotFound { room: RoomName },
    Error { code: String, message: String, retryable: bool },
}

impl ServerEvent {
    /// Build a structured error event from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error { code: err.error_code().to_owned(), message: err.to_string(), retryable: err.retryable() }
    }

    /// Wire tag, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionConnected { .. } => "session-connected",
            Self::LoadData { .. } => "load-data",
            Self::LoadMessages { .. } => "load-messages",
            Self::PencilDraw { .. } => "pencil-draw",
            Self::BrushDraw { .. } => "brush-draw",
            Self::ReceiveUndo { .. } => "receive-undo",
            Self::ConnectedUsers { .. } => "connected-users",
            Self::UserAuthorized => "user-authorized",
            Self::UserDeauthorized => "user-deauthorized",
            Self::ReceiveMessage { .. } => "receive-message",
            Self::GridExpanded { .. } => "grid-expanded",
            Self::RoomNotFound { .. } => "room-not-found",
            Self::Error { .. } => "error",
        }
    }

    /// High-frequency stroke traffic is kept out of info-level logs.
    #[must_use]
    pub fn is_stroke(&self) -> bool {
        matches!(self, Self::PencilDraw { .. } | Self::BrushDraw { .. } | Self::ReceiveUndo { .. })
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
