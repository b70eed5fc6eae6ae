//! Canvas core — the authoritative per-room state and the rules that mutate it.
//!
//! ARCHITECTURE
//! ============
//! Everything in this module is synchronous and I/O free. A [`room::Room`]
//! is only ever reached through the registry's per-room lock, so the types
//! here assume exclusive access and never lock internally.
//!
//! - `name`, `identity` — room names and who is acting
//! - `grid`     — color cells, provenance, contributors
//! - `presence` — identities currently in the room, deduplicated by identity
//! - `access`   — owner-curated authorization set
//! - `draw`     — pencil/brush/undo rules and per-connection undo stacks
//! - `router`   — outbound fan-out to the room's live connections
//! - `chat`     — bounded in-memory chat log
//! - `room`     — ties the above together for one named room

pub mod access;
pub mod chat;
pub mod draw;
pub mod grid;
pub mod identity;
pub mod name;
pub mod presence;
pub mod room;
pub mod router;
