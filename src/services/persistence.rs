//! Persistence service — periodic flush of dirty rooms.
//!
//! DESIGN
//! ======
//! Rooms are saved when their last identity leaves, but a busy room may stay
//! active for hours. A background task wakes every
//! `ROOM_FLUSH_INTERVAL_MS`, saves every dirty active room, and finishes
//! evicting rooms whose final save failed earlier. `main` runs one more
//! flush after the server stops accepting connections.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::registry::{FlushStats, RoomRegistry};

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(rooms: Arc<RoomRegistry>, interval_ms: u64) -> JoinHandle<()> {
    info!(interval_ms, "room flush configured");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing is dirty yet.
        interval.tick().await;
        loop {
            interval.tick().await;
            flush_once(&rooms).await;
        }
    })
}

/// Run one flush pass and log what it did.
pub async fn flush_once(rooms: &RoomRegistry) -> FlushStats {
    let stats = rooms.flush_dirty().await;
    if stats.failed > 0 {
        warn!(saved = stats.saved, failed = stats.failed, evicted = stats.evicted, "room flush incomplete");
    } else if stats.saved > 0 || stats.evicted > 0 {
        let active = rooms.active_count().await;
        debug!(saved = stats.saved, evicted = stats.evicted, active, "flushed rooms");
    }
    stats
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
