//! Grid store — color cells, their provenance, and the contributor roster.
//!
//! DESIGN
//! ======
//! Colors and placers live in two parallel row-major vectors of identical
//! length, so the "same dimensions" invariant is structural. `place` and
//! `restore` do no validation: callers check `is_valid_cell` and
//! `is_valid_color` first. The only validating entry point is
//! [`Grid::from_rows`], which guards everything loaded from persistence.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use super::identity::Profile;

/// Largest single `expand` step.
pub const MAX_EXPAND: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("grid has no cells")]
    Empty,
    #[error("grid row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, found: usize, expected: usize },
    #[error("placer layout does not match the {width}x{height} grid")]
    PlacerMismatch { width: usize, height: usize },
    #[error("cell ({x}, {y}) holds color {color} outside a palette of {palette_size}")]
    ColorOutOfRange { x: usize, y: usize, color: u8, palette_size: u16 },
}

/// Contents of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub color: u8,
    /// `None` when nobody has placed this cell.
    pub placer: Option<Uuid>,
}

/// Row-major copy of the grid for transmission or persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    pub grid: Vec<Vec<u8>>,
    pub placer: Vec<Vec<Option<Uuid>>>,
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    palette_size: u16,
    colors: Vec<u8>,
    placers: Vec<Option<Uuid>>,
    contributors: HashMap<Uuid, Profile>,
}

impl Grid {
    /// A fresh grid with every cell set to `color` and no placers.
    #[cfg(test)]
    pub fn filled(width: usize, height: usize, color: u8, palette_size: u16) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            palette_size,
            colors: vec![color; len],
            placers: vec![None; len],
            contributors: HashMap::new(),
        }
    }

    /// Rebuild a grid from persisted rows.
    ///
    /// `profiles` should hold every distinct placer id; ids missing from it
    /// are registered as [`Profile::unknown`] so the contributor roster still
    /// covers every placed cell.
    ///
    /// # Errors
    ///
    /// Returns `GridError` if the rows are empty, ragged, disagree with the
    /// placer layout, or hold a color outside the palette.
    pub fn from_rows(
        grid: Vec<Vec<u8>>,
        placer: Vec<Vec<Option<Uuid>>>,
        profiles: &HashMap<Uuid, Profile>,
        palette_size: u16,
    ) -> Result<Self, GridError> {
        let height = grid.len();
        let width = grid.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(GridError::Empty);
        }

        for (y, row) in grid.iter().enumerate() {
            if row.len() != width {
                return Err(GridError::Ragged { row: y, found: row.len(), expected: width });
            }
            if let Some((x, &color)) = row
                .iter()
                .enumerate()
                .find(|&(_, &c)| u16::from(c) >= palette_size)
            {
                return Err(GridError::ColorOutOfRange { x, y, color, palette_size });
            }
        }
        if placer.len() != height || placer.iter().any(|row| row.len() != width) {
            return Err(GridError::PlacerMismatch { width, height });
        }

        let colors: Vec<u8> = grid.into_iter().flatten().collect();
        let placers: Vec<Option<Uuid>> = placer.into_iter().flatten().collect();

        let mut contributors = HashMap::new();
        for id in placers.iter().flatten() {
            contributors
                .entry(*id)
                .or_insert_with(|| profiles.get(id).cloned().unwrap_or_else(|| Profile::unknown(*id)));
        }

        Ok(Self { width, height, palette_size, colors, placers, contributors })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The palette's last entry (white) is what new cells start as.
    #[must_use]
    pub fn blank_color(&self) -> u8 {
        blank_color(self.palette_size)
    }

    #[must_use]
    pub fn is_valid_cell(&self, x: u32, y: u32) -> bool {
        (x as usize) < self.width && (y as usize) < self.height
    }

    #[must_use]
    pub fn is_valid_color(&self, color: u8) -> bool {
        u16::from(color) < self.palette_size
    }

    #[must_use]
    pub fn cell(&self, x: u32, y: u32) -> Option<Cell> {
        if !self.is_valid_cell(x, y) {
            return None;
        }
        let i = self.index(x, y);
        Some(Cell { color: self.colors[i], placer: self.placers[i] })
    }

    /// Overwrite one cell and record `identity` as its placer. Returns what
    /// the cell held before.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the grid.
    pub fn place(&mut self, x: u32, y: u32, color: u8, identity: &Profile) -> Cell {
        let i = self.index(x, y);
        let prior = Cell { color: self.colors[i], placer: self.placers[i] };
        self.colors[i] = color;
        self.placers[i] = Some(identity.id);
        self.contributors
            .entry(identity.id)
            .or_insert_with(|| identity.clone());
        prior
    }

    /// Put a previously captured cell back exactly as it was, including an
    /// unset placer.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the grid.
    pub fn restore(&mut self, x: u32, y: u32, cell: Cell) {
        let i = self.index(x, y);
        self.colors[i] = cell.color;
        self.placers[i] = cell.placer;
    }

    #[must_use]
    pub fn contributor(&self, id: Uuid) -> Option<&Profile> {
        self.contributors.get(&id)
    }

    #[must_use]
    pub fn contributors(&self) -> Vec<Profile> {
        let mut out: Vec<Profile> = self.contributors.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        out
    }

    /// Grow both dimensions by `amount`, filling new cells with the blank
    /// color and no placer. Existing coordinates keep their contents.
    pub fn expand(&mut self, amount: usize) {
        if amount == 0 {
            return;
        }
        let blank = self.blank_color();
        let new_width = self.width + amount;
        let new_height = self.height + amount;

        let mut colors = Vec::with_capacity(new_width * new_height);
        let mut placers = Vec::with_capacity(new_width * new_height);
        for (color_row, placer_row) in self
            .colors
            .chunks(self.width)
            .zip(self.placers.chunks(self.width))
        {
            colors.extend_from_slice(color_row);
            colors.resize(colors.len() + amount, blank);
            placers.extend_from_slice(placer_row);
            placers.resize(placers.len() + amount, None);
        }
        colors.resize(new_width * new_height, blank);
        placers.resize(new_width * new_height, None);

        self.width = new_width;
        self.height = new_height;
        self.colors = colors;
        self.placers = placers;
    }

    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            grid: self.colors.chunks(self.width).map(<[u8]>::to_vec).collect(),
            placer: self
                .placers
                .chunks(self.width)
                .map(<[Option<Uuid>]>::to_vec)
                .collect(),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(self.is_valid_cell(x, y), "cell ({x}, {y}) outside {}x{} grid", self.width, self.height);
        y as usize * self.width + x as usize
    }
}

/// Blank (white) color for a palette: its last entry.
#[must_use]
pub fn blank_color(palette_size: u16) -> u8 {
    u8::try_from(palette_size.saturating_sub(1)).unwrap_or(u8::MAX)
}

/// Every distinct identity recorded in a placer layout.
#[must_use]
pub fn distinct_placers(placer: &[Vec<Option<Uuid>>]) -> Vec<Uuid> {
    let ids: HashSet<Uuid> = placer.iter().flatten().flatten().copied().collect();
    ids.into_iter().collect()
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod tests;
