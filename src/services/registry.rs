//! Room registry — activation, lookup and eviction of live rooms.
//!
//! ARCHITECTURE
//! ============
//! The registry maps a normalized room name to an entry holding a
//! [`RoomSlot`] behind its own async mutex. The outer map lock is only held
//! long enough to find or insert an entry, so rooms never contend with each
//! other; everything that touches one room runs under that room's lock and
//! is therefore serialized.
//!
//! LIFECYCLE
//! =========
//! `Vacant -> Active -> Closed`, one way only. A join that finds `Vacant`
//! loads the room while holding the lock, so concurrent joins wait for
//! activation instead of loading twice. When the last identity leaves, the
//! room is saved under the same lock and the slot becomes `Closed` before
//! the entry is dropped from the map. A join racing that save blocks on the
//! lock, sees `Closed`, discards the stale entry and retries against a fresh
//! one, which loads what was just saved.
//!
//! ERROR HANDLING
//! ==============
//! A failed load fails the join and leaves no active room behind. A failed
//! save on deactivation keeps the room `Active` and dirty with nobody in it;
//! the periodic flush retries the save and evicts the room once it lands.
//!
//! VIEWS
//! =====
//! Anonymous viewers of an inactive room get a snapshot built from storage.
//! Snapshots are cached per room until the next successful save of that
//! room; a save epoch lets a load that raced a save discard its result
//! instead of caching stale pixels.
//!
//! Periodic flushes save live rooms outside the room lock so drawing never
//! waits on the database. A per-room persist lock, always taken after the
//! room lock, orders an in-flight flush before a deactivation save, and the
//! room's revision counter stays dirty until a save acknowledges it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard, RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use super::store::{RoomStore, StoreError};
use crate::canvas::grid::{self, GridError};
use crate::canvas::identity::Identity;
use crate::canvas::name::RoomName;
use crate::canvas::room::Room;
use crate::config::CanvasConfig;
use crate::event::{ErrorCode, ServerEvent};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(RoomName),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("room {name} has an invalid grid: {source}")]
    Corrupt { name: RoomName, source: GridError },
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::Store(e) => e.error_code(),
            Self::Corrupt { .. } => "E_ROOM_CORRUPT",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

enum RoomSlot {
    /// Entry exists but nothing is loaded yet (or the load failed).
    Vacant,
    Active(Room),
    /// Saved and evicted; the entry is about to leave the map.
    Closed,
}

struct RoomEntry {
    slot: Mutex<RoomSlot>,
    persist: Mutex<()>,
}

impl RoomEntry {
    fn new() -> Self {
        Self { slot: Mutex::new(RoomSlot::Vacant), persist: Mutex::new(()) }
    }
}

/// What one flush pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    pub saved: usize,
    pub failed: usize,
    pub evicted: usize,
}

/// Live view of an active room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSummary {
    pub width: usize,
    pub height: usize,
    pub connected: usize,
}

/// Cached anonymous snapshots kept before the cache is reset.
const VIEW_CACHE_CAPACITY: usize = 256;

pub struct RoomRegistry {
    store: Arc<dyn RoomStore>,
    config: CanvasConfig,
    rooms: RwLock<HashMap<RoomName, Arc<RoomEntry>>>,
    views: Mutex<HashMap<RoomName, ServerEvent>>,
    save_epoch: AtomicU64,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn RoomStore>, config: CanvasConfig) -> Self {
        Self {
            store,
            config,
            rooms: RwLock::new(HashMap::new()),
            views: Mutex::new(HashMap::new()),
            save_epoch: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    /// Number of rooms currently loaded.
    pub async fn active_count(&self) -> usize {
        let entries: Vec<Arc<RoomEntry>> = self.rooms.read().await.values().cloned().collect();
        let mut count = 0;
        for entry in entries {
            if matches!(*entry.slot.lock().await, RoomSlot::Active(_)) {
                count += 1;
            }
        }
        count
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Attach an identified connection to a room, activating it if needed.
    /// Returns the events only the joining connection should receive.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::NotFound` when persistence has no such room, or a
    /// store/corruption error when activation fails.
    pub async fn join(
        &self,
        name: &RoomName,
        client_id: Uuid,
        identity: &Identity,
        tx: mpsc::Sender<ServerEvent>,
    ) -> Result<Vec<ServerEvent>, RoomError> {
        loop {
            let entry = self.entry(name).await;
            let mut slot = entry.slot.lock().await;

            if let RoomSlot::Active(room) = &mut *slot {
                let replies = room.admit(client_id, identity, tx);
                info!(room = %name, %client_id, identities = room.presence_count(), "client joined room");
                return Ok(replies);
            }
            if matches!(*slot, RoomSlot::Closed) {
                drop(slot);
                self.forget(name, &entry).await;
                continue;
            }

            match self.load(name).await {
                Ok(mut room) => {
                    info!(
                        room = %name,
                        width = room.grid().width(),
                        height = room.grid().height(),
                        contributors = room.grid().contributors().len(),
                        "activated room"
                    );
                    let replies = room.admit(client_id, identity, tx);
                    info!(room = %name, %client_id, identities = 1, "client joined room");
                    *slot = RoomSlot::Active(room);
                    return Ok(replies);
                }
                Err(err) => {
                    *slot = RoomSlot::Closed;
                    drop(slot);
                    self.forget(name, &entry).await;
                    return Err(err);
                }
            }
        }
    }

    /// Snapshot for an anonymous viewer. Never activates the room and never
    /// registers the viewer anywhere.
    ///
    /// # Errors
    ///
    /// Same as [`RoomRegistry::join`].
    pub async fn view(&self, name: &RoomName) -> Result<ServerEvent, RoomError> {
        loop {
            let existing = self.rooms.read().await.get(name).cloned();
            let Some(entry) = existing else {
                return self.stored_view(name).await;
            };

            let slot = entry.slot.lock().await;
            if let RoomSlot::Active(room) = &*slot {
                return Ok(room.load_data_for(None));
            }
            if matches!(*slot, RoomSlot::Vacant) {
                drop(slot);
                return self.stored_view(name).await;
            }
            drop(slot);
            self.forget(name, &entry).await;
        }
    }

    /// Detach a connection. The room is saved and evicted once nobody is
    /// left in it.
    pub async fn leave(&self, name: &RoomName, client_id: Uuid, identity_id: Uuid) {
        let existing = self.rooms.read().await.get(name).cloned();
        let Some(entry) = existing else {
            return;
        };

        let mut slot = entry.slot.lock().await;
        let RoomSlot::Active(room) = &mut *slot else {
            return;
        };
        let departure = room.depart(client_id, identity_id);
        info!(
            room = %name,
            %client_id,
            ?departure,
            identities = room.presence_count(),
            connections = room.connection_count(),
            "client left room"
        );

        if room.presence_count() == 0 {
            self.deactivate(name, &entry, slot).await;
        }
    }

    // =========================================================================
    // ACCESS
    // =========================================================================

    /// Run `f` against an active room under its lock. `None` if the room is
    /// not active.
    pub async fn with_room<R>(&self, name: &RoomName, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let entry = self.rooms.read().await.get(name).cloned()?;
        let mut slot = entry.slot.lock().await;
        match &mut *slot {
            RoomSlot::Active(room) => Some(f(room)),
            RoomSlot::Vacant | RoomSlot::Closed => None,
        }
    }

    pub async fn summary(&self, name: &RoomName) -> Option<ActiveSummary> {
        self.with_room(name, |room| ActiveSummary {
            width: room.grid().width(),
            height: room.grid().height(),
            connected: room.presence_count(),
        })
        .await
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Save every dirty active room, and evict rooms that are still loaded
    /// with nobody in them.
    pub async fn flush_dirty(&self) -> FlushStats {
        let entries: Vec<(RoomName, Arc<RoomEntry>)> = self
            .rooms
            .read()
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
            .collect();

        let mut stats = FlushStats::default();
        for (name, entry) in entries {
            let mut slot = entry.slot.lock().await;
            let RoomSlot::Active(room) = &mut *slot else {
                continue;
            };

            // PHASE: EMPTY ROOMS
            // Retained after a failed deactivation save; finish the job.
            if room.presence_count() == 0 {
                let dirty = room.is_dirty();
                if self.deactivate(&name, &entry, slot).await {
                    stats.evicted += 1;
                    stats.saved += usize::from(dirty);
                } else {
                    stats.failed += 1;
                }
                continue;
            }

            // PHASE: LIVE ROOMS
            // Capture under the room lock, write with only the persist lock.
            let Some((record, revision)) = room.pending_save() else {
                continue;
            };
            let persist = entry.persist.lock().await;
            drop(slot);

            let result = self.store.save_room(&record).await;
            drop(persist);
            match result {
                Ok(()) => {
                    stats.saved += 1;
                    self.saved(&name).await;
                    if let RoomSlot::Active(room) = &mut *entry.slot.lock().await {
                        room.mark_saved(revision);
                    }
                }
                Err(e) => {
                    warn!(error = %e, room = %name, "room flush failed; will retry");
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    /// Build a room from persistence without registering it.
    async fn load(&self, name: &RoomName) -> Result<Room, RoomError> {
        let record = self
            .store
            .load_room(name)
            .await?
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;
        let placers = grid::distinct_placers(&record.placer);
        let profiles = self.store.resolve_identities(&placers).await?;
        Room::from_record(record, &profiles, &self.config)
            .map_err(|source| RoomError::Corrupt { name: name.clone(), source })
    }

    /// Anonymous snapshot of a room that is not active, cached until the
    /// room is next saved.
    async fn stored_view(&self, name: &RoomName) -> Result<ServerEvent, RoomError> {
        if let Some(view) = self.views.lock().await.get(name) {
            return Ok(view.clone());
        }

        let epoch = self.save_epoch.load(Ordering::Acquire);
        let view = self.load(name).await?.load_data_for(None);

        let mut views = self.views.lock().await;
        if self.save_epoch.load(Ordering::Acquire) == epoch {
            if views.len() >= VIEW_CACHE_CAPACITY {
                views.clear();
            }
            views.insert(name.clone(), view.clone());
        }
        Ok(view)
    }

    /// Invalidate cached views after a save of `name` lands.
    async fn saved(&self, name: &RoomName) {
        self.save_epoch.fetch_add(1, Ordering::AcqRel);
        self.views.lock().await.remove(name);
    }

    /// Save and evict an empty room. Consumes the slot guard so the entry
    /// leaves the map only after the lock is released. Returns whether the
    /// room was evicted.
    async fn deactivate(&self, name: &RoomName, entry: &Arc<RoomEntry>, mut slot: MutexGuard<'_, RoomSlot>) -> bool {
        let RoomSlot::Active(room) = &mut *slot else {
            return false;
        };

        if let Some((record, revision)) = room.pending_save() {
            let _persist = entry.persist.lock().await;
            if let Err(e) = self.store.save_room(&record).await {
                warn!(error = %e, room = %name, "final room save failed; room retained for retry");
                return false;
            }
            room.mark_saved(revision);
            self.saved(name).await;
        }

        *slot = RoomSlot::Closed;
        drop(slot);
        self.forget(name, entry).await;
        info!(room = %name, "evicted room from memory");
        true
    }

    async fn entry(&self, name: &RoomName) -> Arc<RoomEntry> {
        if let Some(entry) = self.rooms.read().await.get(name) {
            return Arc::clone(entry);
        }
        let mut rooms = self.rooms.write().await;
        Arc::clone(rooms.entry(name.clone()).or_insert_with(|| Arc::new(RoomEntry::new())))
    }

    /// Drop `entry` from the map unless it has already been replaced.
    async fn forget(&self, name: &RoomName, entry: &Arc<RoomEntry>) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(name).is_some_and(|current| Arc::ptr_eq(current, entry)) {
            rooms.remove(name);
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
