//! Grid occupancy storage
//!
//! A grid is a fixed-size cell matrix plus the list of items placed on it.
//! Placed items are owned by the grid; a cell is occupied iff exactly one
//! placed item covers it.

use crate::item::{ItemInstance, ItemUid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime identity of a grid. Never reused, so a stale id simply stops
/// resolving once its grid is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(pub(crate) u64);

impl GridId {
    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid#{}", self.0)
    }
}

/// Kind of grid, as written to saves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridType {
    /// Main storage
    Main,
    /// Spawned by an equipped backpack
    Backpack,
    /// Spawned by an equipped tactical rig
    TacticalRig,
}

/// Cell coordinate. Signed so that out-of-range probes stay representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Width and height in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub w: u32,
    pub h: u32,
}

impl Footprint {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Footprint with width and height swapped
    pub const fn rotated(self) -> Self {
        Self { w: self.h, h: self.w }
    }

    /// Whether rotating changes the footprint
    pub const fn is_square(self) -> bool {
        self.w == self.h
    }
}

/// Rectangular block of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub origin: CellPos,
    pub size: Footprint,
}

impl Region {
    pub const fn new(origin: CellPos, size: Footprint) -> Self {
        Self { origin, size }
    }

    /// Check if a cell lies inside the region
    pub fn contains(&self, cell: CellPos) -> bool {
        cell.x >= self.origin.x
            && cell.y >= self.origin.y
            && (cell.x as i64) < self.origin.x as i64 + self.size.w as i64
            && (cell.y as i64) < self.origin.y as i64 + self.size.h as i64
    }

    /// Iterate the cells of the region, row by row
    pub fn cells(&self) -> impl Iterator<Item = CellPos> {
        let Region { origin, size } = *self;
        (0..size.h as i32).flat_map(move |dy| {
            (0..size.w as i32).map(move |dx| CellPos::new(origin.x + dx, origin.y + dy))
        })
    }
}

/// An item bound to a rectangle of a grid
#[derive(Debug, Clone)]
pub struct PlacedItem {
    /// The item itself, owned by the grid while placed
    pub item: ItemInstance,
    /// Top-left cell
    pub origin: CellPos,
    /// Footprint with rotation already applied
    pub size: Footprint,
}

impl PlacedItem {
    /// Unique id of the placed item
    pub fn uid(&self) -> ItemUid {
        self.item.uid
    }

    /// Region covered by the item
    pub fn region(&self) -> Region {
        Region::new(self.origin, self.size)
    }

    /// Check if the item covers a cell
    pub fn covers(&self, cell: CellPos) -> bool {
        self.region().contains(cell)
    }
}

/// Cell count of a `width x height` grid
fn cell_count(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height)
}

/// Occupancy matrix and placed-item list of one grid
#[derive(Debug, Clone)]
pub struct GridOccupancyStore {
    width: u32,
    height: u32,
    /// Row-major occupancy flags
    occupancy: Vec<bool>,
    placed: Vec<PlacedItem>,
}

impl GridOccupancyStore {
    /// Create an empty store
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            occupancy: vec![false; cell_count(width, height) as usize],
            placed: Vec::new(),
        }
    }

    /// Width in cells
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size as a footprint
    pub fn size(&self) -> Footprint {
        Footprint::new(self.width, self.height)
    }

    /// Check if a cell lies inside the grid
    pub fn in_bounds(&self, cell: CellPos) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    fn index(&self, cell: CellPos) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.y as usize * self.width as usize + cell.x as usize)
        } else {
            None
        }
    }

    /// Set every cell of `region` to `value`. The region must be in bounds.
    pub fn mark(&mut self, region: Region, value: bool) {
        for cell in region.cells() {
            match self.index(cell) {
                Some(index) => self.occupancy[index] = value,
                None => debug_assert!(false, "mark outside grid at {}", cell),
            }
        }
    }

    /// Check if a cell is occupied (out-of-range cells count as free)
    pub fn is_occupied(&self, cell: CellPos) -> bool {
        self.index(cell).map(|i| self.occupancy[i]).unwrap_or(false)
    }

    /// Item covering `(x, y)`, if any
    pub fn item_at(&self, x: i32, y: i32) -> Option<ItemUid> {
        self.placed_at(CellPos::new(x, y)).map(PlacedItem::uid)
    }

    /// Placed record covering a cell
    pub fn placed_at(&self, cell: CellPos) -> Option<&PlacedItem> {
        self.placed.iter().find(|p| p.covers(cell))
    }

    /// Number of occupied cells
    pub fn occupied_count(&self) -> usize {
        self.occupancy.iter().filter(|c| **c).count()
    }

    /// Number of free cells
    pub fn free_count(&self) -> usize {
        self.occupancy.len() - self.occupied_count()
    }

    /// Fraction of cells occupied
    pub fn occupancy_rate(&self) -> f32 {
        let total = self.occupancy.len();
        if total == 0 {
            0.0
        } else {
            self.occupied_count() as f32 / total as f32
        }
    }

    /// All placed records
    pub fn placed(&self) -> &[PlacedItem] {
        &self.placed
    }

    /// Find a placed record by item uid
    pub fn find(&self, uid: ItemUid) -> Option<&PlacedItem> {
        self.placed.iter().find(|p| p.uid() == uid)
    }

    /// Find a mutable placed record by item uid
    pub fn find_mut(&mut self, uid: ItemUid) -> Option<&mut PlacedItem> {
        self.placed.iter_mut().find(|p| p.uid() == uid)
    }

    /// Mark a record's cells and store it. Validation happens upstream.
    pub(crate) fn insert(&mut self, placed: PlacedItem) {
        self.mark(placed.region(), true);
        self.placed.push(placed);
    }

    /// Clear a record's cells and hand it back
    pub(crate) fn take(&mut self, uid: ItemUid) -> Option<PlacedItem> {
        let index = self.placed.iter().position(|p| p.uid() == uid)?;
        let placed = self.placed.swap_remove(index);
        self.mark(placed.region(), false);
        Some(placed)
    }

    /// Remove every record and clear all cells
    pub(crate) fn drain(&mut self) -> Vec<PlacedItem> {
        self.occupancy.iter_mut().for_each(|c| *c = false);
        std::mem::take(&mut self.placed)
    }

    /// Occupancy of one row, for diagnostics
    pub fn row(&self, y: u32) -> &[bool] {
        let start = y as usize * self.width as usize;
        &self.occupancy[start..start + self.width as usize]
    }

    /// Rebuild coverage from the records and compare with the matrix.
    ///
    /// True iff every record is in bounds, no two records share a cell and
    /// the occupancy flags match the records exactly.
    pub fn check_invariant(&self) -> bool {
        let mut coverage = vec![0u8; self.occupancy.len()];
        for placed in &self.placed {
            for cell in placed.region().cells() {
                match self.index(cell) {
                    Some(i) => coverage[i] = coverage[i].saturating_add(1),
                    None => return false,
                }
            }
        }
        coverage
            .iter()
            .zip(&self.occupancy)
            .all(|(count, occupied)| (*count == 1) == *occupied && *count <= 1)
    }
}
