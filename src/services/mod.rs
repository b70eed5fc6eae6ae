//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room lifecycle and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod persistence;
pub mod registry;
pub mod rooms;
pub mod session;
pub mod store;
