//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the database pool for session and identity queries, the room
//! registry that owns every live canvas, and the startup configuration.
//! Room persistence goes through the registry's `RoomStore`, never through
//! the pool directly, so tests can run the whole room lifecycle in memory.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::registry::RoomRegistry;
use crate::services::store::RoomStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rooms: Arc<RoomRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, store: Arc<dyn RoomStore>, config: Config) -> Self {
        let rooms = Arc::new(RoomRegistry::new(store, config.canvas.clone()));
        Self { pool, rooms, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
