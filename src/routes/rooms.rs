//! Room routes — provisioning and lookup over REST.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::canvas::name::RoomName;
use crate::event::ErrorCode;
use crate::services::rooms::{self, CreateRoomError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRoomBody {
    pub name: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct RoomInfo {
    pub name: RoomName,
    pub width: usize,
    pub height: usize,
    pub owner_id: Option<Uuid>,
    pub active: bool,
    pub connected: usize,
}

pub(crate) fn create_error_status(err: &CreateRoomError) -> StatusCode {
    match err {
        CreateRoomError::InvalidName(_) => StatusCode::BAD_REQUEST,
        CreateRoomError::AlreadyOwner => StatusCode::FORBIDDEN,
        CreateRoomError::NameTaken(_) => StatusCode::CONFLICT,
        CreateRoomError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `POST /api/rooms` — create a room owned by the caller.
pub async fn create_room(State(state): State<AppState>, auth: AuthUser, Json(body): Json<CreateRoomBody>) -> Response {
    match rooms::create_room(state.rooms.store().as_ref(), &auth.identity, &body.name, state.rooms.config()).await {
        Ok(name) => (StatusCode::CREATED, Json(serde_json::json!({ "name": name }))).into_response(),
        Err(e) => {
            let status = create_error_status(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "room creation failed");
            }
            let body = serde_json::json!({ "code": e.error_code(), "message": e.to_string() });
            (status, Json(body)).into_response()
        }
    }
}

/// `GET /api/rooms/{name}` — stored room plus live status.
pub async fn get_room(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<RoomInfo>, StatusCode> {
    let name = RoomName::new(&name);
    let record = state
        .rooms
        .store()
        .load_room(&name)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, room = %name, "room lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut info = RoomInfo {
        name: record.name,
        width: record.grid.first().map_or(0, Vec::len),
        height: record.grid.len(),
        owner_id: record.owner_id,
        active: false,
        connected: 0,
    };
    // The live grid may have grown since the last save.
    if let Some(live) = state.rooms.summary(&name).await {
        info.width = live.width;
        info.height = live.height;
        info.active = true;
        info.connected = live.connected;
    }
    Ok(Json(info))
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
