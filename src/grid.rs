//! Grid allocator.
//!
//! The screen is divided into a fixed `N × N` grid.  [`Grid`] hands out
//! free cells in row-major order and turns a cell into pixel
//! [`Geometry`] for the current [`ScreenSize`].
//!
//! Geometry uses floor rounding on real-valued cell sizes.  When the screen
//! is not divisible by `N`, a strip of at most `N - 1` pixels is left
//! uncovered at the right and bottom edges; the remainder is never
//! redistributed, so stored layouts stay pixel-compatible.

use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default grid dimension.
pub const DEFAULT_GRID_SIZE: usize = 4;

/// A `(row, col)` position in the grid.
///
/// Serialised as the two-element array `[row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for GridCell {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl From<GridCell> for (usize, usize) {
    fn from(cell: GridCell) -> Self {
        (cell.row, cell.col)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Pixel rectangle of a placed window, relative to the screen origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether two rectangles share at least one pixel.
    pub fn overlaps(&self, other: &Geometry) -> bool {
        let (ax2, ay2) = (
            self.x as i64 + self.width as i64,
            self.y as i64 + self.height as i64,
        );
        let (bx2, by2) = (
            other.x as i64 + other.width as i64,
            other.y as i64 + other.height as i64,
        );
        (self.x as i64) < bx2 && (other.x as i64) < ax2 && (self.y as i64) < by2 && (other.y as i64) < ay2
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Compute the pixel geometry of `cell` on a `screen` split into `n × n`
/// cells.
///
/// `cell_w = width / n` and `cell_h = height / n` are real-valued; every
/// component is then floored.  `n` must be non-zero.
pub fn compute_geometry(cell: GridCell, screen: ScreenSize, n: usize) -> Geometry {
    let cell_w = screen.width as f64 / n as f64;
    let cell_h = screen.height as f64 / n as f64;
    Geometry {
        x: (cell.col as f64 * cell_w).floor() as i32,
        y: (cell.row as f64 * cell_h).floor() as i32,
        width: cell_w.floor() as u32,
        height: cell_h.floor() as u32,
    }
}

/// A fixed `size × size` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    size: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}

impl Grid {
    /// Create a grid with `size` rows and columns.
    ///
    /// A size of `0` is bumped to `1`; configuration validation rejects it
    /// before it gets here.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
        }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells.
    pub fn capacity(&self) -> usize {
        self.size * self.size
    }

    /// Whether `cell` lies inside the grid.
    pub fn contains(&self, cell: GridCell) -> bool {
        cell.row < self.size && cell.col < self.size
    }

    /// Every cell in scan order: row by row, columns left to right.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> {
        let size = self.size;
        (0..size).flat_map(move |row| (0..size).map(move |col| GridCell { row, col }))
    }

    /// First cell, in scan order, that no slot in `registry` holds.
    ///
    /// `None` means the grid is full.  That is an ordinary outcome, not an
    /// error: the caller simply leaves the window unplaced.
    pub fn find_free_cell(&self, registry: &Registry) -> Option<GridCell> {
        self.cells().find(|cell| registry.occupant(*cell).is_none())
    }

    /// Geometry of `cell` on `screen` for this grid.
    pub fn geometry(&self, cell: GridCell, screen: ScreenSize) -> Geometry {
        compute_geometry(cell, screen, self.size)
    }
}

//  Tests
