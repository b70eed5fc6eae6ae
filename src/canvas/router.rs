//! Broadcast router — outbound fan-out to a room's live connections.
//!
//! Each subscribed connection owns a bounded channel drained by its socket
//! task. Delivery is best-effort `try_send`: a full or closed channel drops
//! the event for that connection only, so one slow client never stalls the
//! room.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::event::ServerEvent;

struct Sink {
    identity_id: Uuid,
    tx: mpsc::Sender<ServerEvent>,
}

#[derive(Default)]
pub struct Router {
    sinks: HashMap<Uuid, Sink>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, client_id: Uuid, identity_id: Uuid, tx: mpsc::Sender<ServerEvent>) {
        self.sinks.insert(client_id, Sink { identity_id, tx });
    }

    pub fn unsubscribe(&mut self, client_id: Uuid) -> bool {
        self.sinks.remove(&client_id).is_some()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.sinks.len()
    }

    /// Send to every subscribed connection except `exclude`. Returns how many
    /// connections accepted the event.
    pub fn to_room(&self, event: &ServerEvent, exclude: Option<Uuid>) -> usize {
        self.sinks
            .iter()
            .filter(|(client_id, _)| exclude != Some(**client_id))
            .filter(|(client_id, sink)| deliver(**client_id, &sink.tx, event))
            .count()
    }

    /// Send to every connection belonging to one identity.
    pub fn to_identity(&self, identity_id: Uuid, event: &ServerEvent) -> usize {
        self.sinks
            .iter()
            .filter(|(_, sink)| sink.identity_id == identity_id)
            .filter(|(client_id, sink)| deliver(**client_id, &sink.tx, event))
            .count()
    }
}

fn deliver(client_id: Uuid, tx: &mpsc::Sender<ServerEvent>, event: &ServerEvent) -> bool {
    match tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(%client_id, event = event.name(), "client queue full; dropping event");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(%client_id, event = event.name(), "client queue closed; dropping event");
            false
        }
    }
}
