//! WebSocket handler — one connection's view of the canvas.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client events → parse + dispatch against the joined room
//! - Events routed from room peers → forward to client
//!
//! Room methods do the fan-out to peers themselves; dispatch only returns
//! what the sending connection should receive directly. Events that fail a
//! precondition (no identity, no room, not authorized, bad coordinates) are
//! dropped without a reply and logged at debug.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session-connected` with `client_id` and the user
//! 2. `join` → leave the previous room (if any), attach to the new one;
//!    joining the current room again only re-sends its state
//! 3. Draw / undo / access / chat / expand → applied under the room lock
//! 4. Close → leave the room; the last identity out saves and evicts it

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::canvas::draw::{Stroke, UndoStack};
use crate::canvas::identity::Identity;
use crate::canvas::name::RoomName;
use crate::event::{ClientEvent, ServerEvent};
use crate::services::registry::RoomError;
use crate::services::session;
use crate::state::AppState;

// =============================================================================
// CONNECTION
// =============================================================================

/// Per-socket state. Undo history lives here and dies with the socket.
struct Connection {
    client_id: Uuid,
    identity: Option<Identity>,
    room: Option<RoomName>,
    undo: UndoStack,
}

impl Connection {
    fn new(identity: Option<Identity>, undo_limit: usize) -> Self {
        Self { client_id: Uuid::new_v4(), identity, room: None, undo: UndoStack::with_limit(undo_limit) }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WsParams {
    ticket: Option<String>,
}

/// `GET /api/ws[?ticket=...]`. Without a ticket the socket is anonymous and
/// may only view rooms.
pub async fn handle_ws(State(state): State<AppState>, Query(params): Query<WsParams>, ws: WebSocketUpgrade) -> Response {
    let identity = match params.ticket.as_deref() {
        None => None,
        Some(ticket) => match session::consume_ws_ticket(&state.pool, ticket).await {
            Ok(Some(identity)) => Some(identity),
            Ok(None) => return (StatusCode::UNAUTHORIZED, "invalid or expired ticket").into_response(),
            Err(e) => {
                tracing::error!(error = %e, "ws ticket validation failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "ticket validation error").into_response();
            }
        },
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, identity))
}

async fn run_ws(mut socket: WebSocket, state: AppState, identity: Option<Identity>) {
    let mut conn = Connection::new(identity, state.config.canvas.undo_depth_limit);
    let client_id = conn.client_id;

    // Per-connection channel for events routed from the room.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.config.canvas.client_channel_capacity);

    let welcome = ServerEvent::SessionConnected {
        client_id,
        user: conn.identity.as_ref().map(|i| i.profile.clone()),
    };
    if send_event(&mut socket, &welcome).await.is_err() {
        return;
    }

    let user_id = conn.identity.as_ref().map(Identity::id);
    info!(%client_id, ?user_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for event in process_inbound_text(&state, &mut conn, &client_tx, &text).await {
                            let _ = send_event(&mut socket, &event).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    leave_current_room(&state, &mut conn).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse and process one inbound text message and return events for the
/// sender.
///
/// This keeps the websocket transport concerns separate from event handling,
/// so tests can drive a connection without a socket.
async fn process_inbound_text(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            debug!(client_id = %conn.client_id, error = %e, "ws: dropped malformed event");
            return vec![];
        }
    };

    if let ClientEvent::Join { room } = event {
        return join(state, conn, client_tx, RoomName::new(&room)).await;
    }

    let name = event.name();
    let (Some(identity), Some(room)) = (&conn.identity, &conn.room) else {
        debug!(client_id = %conn.client_id, event = name, "ws: dropped event outside a room");
        return vec![];
    };
    let client_id = conn.client_id;
    let actor = identity.id();
    let undo = &mut conn.undo;

    let applied = state
        .rooms
        .with_room(room, |r| match event {
            ClientEvent::PencilDraw { x, y, color } => r
                .draw(Stroke::Pencil, client_id, &identity.profile, undo, x, y, color)
                .map_err(|e| e.to_string()),
            ClientEvent::BrushDraw { x, y, color } => r
                .draw(Stroke::Brush, client_id, &identity.profile, undo, x, y, color)
                .map_err(|e| e.to_string()),
            ClientEvent::Undo if undo.is_empty() => Err("nothing to undo".to_owned()),
            ClientEvent::Undo => {
                let restored = r.undo(undo);
                debug!(%client_id, restored, "ws: undo applied");
                Ok(())
            }
            ClientEvent::Authorize { user_id } => r.authorize(actor, user_id).map_err(|e| e.to_string()),
            ClientEvent::Deauthorize { user_id } => r.deauthorize(actor, user_id).map_err(|e| e.to_string()),
            ClientEvent::SendMessage { text } => {
                if r.post_message(client_id, &identity.profile, &text) {
                    Ok(())
                } else {
                    Err("empty or not present".to_owned())
                }
            }
            ClientEvent::Expand { amount } => r.expand(actor, amount).map_err(|e| e.to_string()),
            ClientEvent::Join { .. } => Ok(()),
        })
        .await;

    match applied {
        Some(Ok(())) => {}
        Some(Err(reason)) => debug!(%client_id, %room, event = name, %reason, "ws: dropped event"),
        None => debug!(%client_id, %room, event = name, "ws: dropped event for inactive room"),
    }
    vec![]
}

async fn join(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<ServerEvent>,
    name: RoomName,
) -> Vec<ServerEvent> {
    let rejoin = match (&conn.identity, &conn.room) {
        (Some(identity), Some(current)) if *current == name => Some(identity.id()),
        _ => None,
    };
    if let Some(id) = rejoin {
        if let Some(replies) = state.rooms.with_room(&name, |r| r.refresh(id)).await {
            debug!(client_id = %conn.client_id, room = %name, "ws: re-join refreshed room state");
            return replies;
        }
    }

    leave_current_room(state, conn).await;

    let Some(identity) = &conn.identity else {
        return match state.rooms.view(&name).await {
            Ok(load) => vec![load],
            Err(e) => join_failed(conn.client_id, e),
        };
    };

    match state.rooms.join(&name, conn.client_id, identity, client_tx.clone()).await {
        Ok(replies) => {
            conn.room = Some(name);
            replies
        }
        Err(e) => join_failed(conn.client_id, e),
    }
}

fn join_failed(client_id: Uuid, err: RoomError) -> Vec<ServerEvent> {
    match err {
        RoomError::NotFound(room) => {
            debug!(%client_id, %room, "ws: join for unknown room");
            vec![ServerEvent::RoomNotFound { room }]
        }
        err => {
            warn!(%client_id, error = %err, "ws: join failed");
            vec![ServerEvent::error_from(&err)]
        }
    }
}

/// Detach from the joined room, if any. Undo history is scoped to one room
/// visit and is discarded with it.
async fn leave_current_room(state: &AppState, conn: &mut Connection) {
    conn.undo.clear();
    let (Some(room), Some(identity)) = (conn.room.take(), &conn.identity) else {
        return;
    };
    state.rooms.leave(&room, conn.client_id, identity.id()).await;
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    if !event.is_stroke() {
        debug!(event = event.name(), "ws: send event");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
