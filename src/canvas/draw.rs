//! Draw/undo engine — stroke validation, application, and reversal.
//!
//! DESIGN
//! ======
//! A stroke is checked in a fixed order (authorization, cell, color) and
//! either applied in full or rejected with no side effects. Before any cell
//! is overwritten its prior contents are captured as a [`ReversalDelta`];
//! the deltas of one accepted stroke form one undo unit on the issuing
//! connection's [`UndoStack`].
//!
//! Undo is not gated by authorization: a stack only ever holds the
//! connection's own strokes, and a user who loses drawing rights mid-session
//! may still take back what they drew.

use std::collections::VecDeque;

use tracing::debug;
use uuid::Uuid;

use super::access::AccessGate;
use super::grid::{Cell, Grid};
use super::identity::Profile;
use crate::config::DEFAULT_UNDO_DEPTH_LIMIT;
use crate::event::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DrawRejection {
    #[error("identity is not authorized to draw")]
    Unauthorized,
    #[error("cell is outside the grid")]
    InvalidCell,
    #[error("color is outside the palette")]
    InvalidColor,
    #[error("stroke changes no cell")]
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    /// One cell.
    Pencil,
    /// Center cell plus its in-bounds orthogonal neighbours.
    Brush,
}

/// What a cell held right before a stroke overwrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversalDelta {
    pub x: u32,
    pub y: u32,
    pub prior_color: u8,
    pub prior_placer: Option<Uuid>,
}

impl ReversalDelta {
    fn capture(x: u32, y: u32, prior: Cell) -> Self {
        Self { x, y, prior_color: prior.color, prior_placer: prior.placer }
    }

    fn prior_cell(&self) -> Cell {
        Cell { color: self.prior_color, placer: self.prior_placer }
    }
}

/// Per-connection LIFO of undo units. Never shared between connections and
/// never persisted. Holds at most `limit` units; the oldest is dropped first.
#[derive(Debug)]
pub struct UndoStack {
    units: VecDeque<Vec<ReversalDelta>>,
    limit: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_limit(DEFAULT_UNDO_DEPTH_LIMIT)
    }
}

impl UndoStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { units: VecDeque::new(), limit: limit.max(1) }
    }

    fn push(&mut self, unit: Vec<ReversalDelta>) {
        if unit.is_empty() {
            return;
        }
        self.units.push_back(unit);
        while self.units.len() > self.limit {
            self.units.pop_front();
        }
    }

    fn pop(&mut self) -> Option<Vec<ReversalDelta>> {
        self.units.pop_back()
    }

    pub fn clear(&mut self) {
        self.units.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Apply a stroke for `actor` and return the event peers need to replay it.
///
/// # Errors
///
/// Returns `DrawRejection` when the actor lacks authorization, the anchor
/// cell or the color is invalid, or (brush only) every covered cell already
/// has the requested color. Nothing is mutated on rejection.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    stroke: Stroke,
    grid: &mut Grid,
    gate: &AccessGate,
    actor: &Profile,
    undo: &mut UndoStack,
    x: u32,
    y: u32,
    color: u8,
) -> Result<ServerEvent, DrawRejection> {
    if !gate.is_authorized(actor.id) {
        return Err(DrawRejection::Unauthorized);
    }
    if !grid.is_valid_cell(x, y) {
        return Err(DrawRejection::InvalidCell);
    }
    if !grid.is_valid_color(color) {
        return Err(DrawRejection::InvalidColor);
    }

    match stroke {
        Stroke::Pencil => {
            let prior = grid.place(x, y, color, actor);
            undo.push(vec![ReversalDelta::capture(x, y, prior)]);
            Ok(ServerEvent::PencilDraw { x, y, color, user: actor.clone() })
        }
        Stroke::Brush => {
            let mut unit = Vec::with_capacity(5);
            for (cx, cy) in brush_cells(grid, x, y) {
                let changes = grid.cell(cx, cy).is_some_and(|cell| cell.color != color);
                if changes {
                    let prior = grid.place(cx, cy, color, actor);
                    unit.push(ReversalDelta::capture(cx, cy, prior));
                }
            }
            if unit.is_empty() {
                return Err(DrawRejection::NoChange);
            }
            undo.push(unit);
            Ok(ServerEvent::BrushDraw { x, y, color, user: actor.clone() })
        }
    }
}

/// Pop the newest undo unit and restore every cell in it. Returns one
/// `receive-undo` event per restored cell; empty when there was nothing to
/// undo.
pub fn undo(grid: &mut Grid, stack: &mut UndoStack) -> Vec<ServerEvent> {
    let Some(unit) = stack.pop() else {
        return Vec::new();
    };

    let mut events = Vec::with_capacity(unit.len());
    for delta in unit.iter().rev() {
        if !grid.is_valid_cell(delta.x, delta.y) {
            debug!(x = delta.x, y = delta.y, "undo delta outside grid; skipped");
            continue;
        }
        grid.restore(delta.x, delta.y, delta.prior_cell());
        events.push(ServerEvent::ReceiveUndo {
            x: delta.x,
            y: delta.y,
            color: delta.prior_color,
            user: delta
                .prior_placer
                .map(|id| grid.contributor(id).cloned().unwrap_or_else(|| Profile::unknown(id))),
        });
    }
    events
}

/// Anchor plus in-bounds up/down/left/right neighbours, anchor first.
fn brush_cells(grid: &Grid, x: u32, y: u32) -> Vec<(u32, u32)> {
    let mut cells = vec![(x, y)];
    if let Some(left) = x.checked_sub(1) {
        cells.push((left, y));
    }
    if let Some(up) = y.checked_sub(1) {
        cells.push((x, up));
    }
    for (nx, ny) in [(x.checked_add(1), Some(y)), (Some(x), y.checked_add(1))] {
        if let (Some(nx), Some(ny)) = (nx, ny) {
            if grid.is_valid_cell(nx, ny) {
                cells.push((nx, ny));
            }
        }
    }
    cells
}

#[cfg(test)]
#[path = "draw_test.rs"]
mod tests;
