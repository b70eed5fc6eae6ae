//! Session and WS-ticket management.
//!
//! ARCHITECTURE
//! ============
//! HTTP auth uses long-lived session tokens, while websocket upgrades use
//! one-time short-lived tickets to avoid sending cookies over WS query params.
//! Both resolve to an [`Identity`]: the user's public profile plus the room
//! they own, if any.
//!
//! TRADE-OFFS
//! ==========
//! Ticket consumption is destructive (`DELETE ... RETURNING`) to guarantee
//! single use; this favors replay safety over reconnect convenience.

use std::fmt::Write;

use rand::Rng;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::canvas::identity::{Identity, Profile};
use crate::canvas::name::RoomName;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Generate a short-lived 16-byte hex WS ticket.
#[must_use]
pub(crate) fn generate_ws_ticket() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes_to_hex(&bytes)
}

fn identity_from_row(row: &PgRow) -> Identity {
    let owned_room: Option<String> = row.get("owned_room");
    Identity {
        profile: Profile { id: row.get("id"), name: row.get("name"), avatar: row.get("avatar_url") },
        owned_room: owned_room.as_deref().map(RoomName::new),
    }
}

/// Create a session for the given user, returning the token.
pub async fn create_session(pool: &PgPool, user_id: Uuid) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
        .bind(&token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Validate a session token and return the associated identity.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<Identity>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.name, u.avatar_url, r.name AS owned_room
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          LEFT JOIN rooms r ON r.owner_id = u.id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(identity_from_row))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Create a short-lived WS ticket for the given user.
pub async fn create_ws_ticket(pool: &PgPool, user_id: Uuid) -> Result<String, sqlx::Error> {
    let ticket = generate_ws_ticket();
    sqlx::query("INSERT INTO ws_tickets (ticket, user_id) VALUES ($1, $2)")
        .bind(&ticket)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(ticket)
}

/// Consume a WS ticket atomically, returning the identity it was issued to.
pub async fn consume_ws_ticket(pool: &PgPool, ticket: &str) -> Result<Option<Identity>, sqlx::Error> {
    let row = sqlx::query(
        r"WITH consumed AS (
              DELETE FROM ws_tickets
              WHERE ticket = $1 AND expires_at > now()
              RETURNING user_id
          )
          SELECT u.id, u.name, u.avatar_url, r.name AS owned_room
          FROM consumed c
          JOIN users u ON u.id = c.user_id
          LEFT JOIN rooms r ON r.owner_id = u.id",
    )
    .bind(ticket)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(identity_from_row))
}

/// Insert a throwaway user for local development. Returns its id.
pub async fn create_dev_user(pool: &PgPool, name: &str) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query("INSERT INTO users (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(row.get("id"))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
