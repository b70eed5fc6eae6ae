//! Room store — persistence seam for room records and contributor profiles.
//!
//! ARCHITECTURE
//! ============
//! The registry only talks to [`RoomStore`]; [`PgRoomStore`] is the
//! production implementation and tests substitute an in-memory one.
//! A room row keeps `grid` and `placer` as row-major JSONB arrays and the
//! authorization set as `UUID[]`, so one `SELECT` activates a room and one
//! `UPDATE` saves it.

use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::canvas::identity::Profile;
use crate::canvas::name::RoomName;
use crate::canvas::room::RoomRecord;
use crate::event::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored room {name} is malformed: {reason}")]
    Decode { name: RoomName, reason: String },
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::Decode { .. } => "E_ROOM_DECODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Load/save contract for rooms plus the identity lookup used to resolve
/// placer ids into contributor profiles.
#[async_trait::async_trait]
pub trait RoomStore: Send + Sync {
    /// Fetch a room by (already normalized) name.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the query fails or the stored row does
    /// not decode.
    async fn load_room(&self, name: &RoomName) -> Result<Option<RoomRecord>, StoreError>;

    /// Overwrite grid, placer and authorization set of an existing room.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    async fn save_room(&self, record: &RoomRecord) -> Result<(), StoreError>;

    /// Insert a new room. `false` when the name or the owner is already
    /// taken.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    async fn create_room(&self, record: &RoomRecord) -> Result<bool, StoreError>;

    /// Profiles for whichever of `ids` still exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the query fails.
    async fn resolve_identities(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Profile>, StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

#[derive(Clone)]
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoomStore for PgRoomStore {
    async fn load_room(&self, name: &RoomName) -> Result<Option<RoomRecord>, StoreError> {
        let row = sqlx::query("SELECT name, owner_id, grid, placer, authorized_ids FROM rooms WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let decode = |reason: sqlx::Error| StoreError::Decode { name: name.clone(), reason: reason.to_string() };
        let Json(grid): Json<Vec<Vec<u8>>> = row.try_get("grid").map_err(decode)?;
        let Json(placer): Json<Vec<Vec<Option<Uuid>>>> = row.try_get("placer").map_err(decode)?;

        Ok(Some(RoomRecord {
            name: RoomName::new(row.get::<String, _>("name").as_str()),
            owner_id: row.get("owner_id"),
            grid,
            placer,
            authorized_ids: row.get("authorized_ids"),
        }))
    }

    async fn save_room(&self, record: &RoomRecord) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE rooms SET grid = $2, placer = $3, authorized_ids = $4, updated_at = now() WHERE name = $1",
        )
        .bind(record.name.as_str())
        .bind(Json(&record.grid))
        .bind(Json(&record.placer))
        .bind(&record.authorized_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_room(&self, record: &RoomRecord) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r"INSERT INTO rooms (name, owner_id, grid, placer, authorized_ids)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT DO NOTHING
              RETURNING name",
        )
        .bind(record.name.as_str())
        .bind(record.owner_id)
        .bind(Json(&record.grid))
        .bind(Json(&record.placer))
        .bind(&record.authorized_ids)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn resolve_identities(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Profile>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query("SELECT id, name, avatar_url FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let profile = Profile { id: r.get("id"), name: r.get("name"), avatar: r.get("avatar_url") };
                (profile.id, profile)
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
