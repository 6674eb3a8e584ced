//! Placement on a single grid
//!
//! [`InventoryGrid`] wraps a [`GridOccupancyStore`] with screen mapping,
//! bounds and overlap validation, first-fit search and rotation.

use crate::error::{InventoryError, PlacementError, Rejected};
use crate::grid::{CellPos, Footprint, GridId, GridOccupancyStore, GridType, PlacedItem, Region};
use crate::item::{ItemFactory, ItemInstance, ItemUid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point in screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Screen-space placement of a grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    /// Top-left corner of cell (0, 0)
    pub origin: ScreenPoint,
    /// Side of one cell in pixels
    pub cell_size: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            origin: ScreenPoint::default(),
            cell_size: 50.0,
        }
    }
}

/// A grid of cells holding placed items
#[derive(Debug)]
pub struct InventoryGrid {
    id: GridId,
    save_id: String,
    grid_type: GridType,
    layout: GridLayout,
    store: GridOccupancyStore,
    pub(crate) factory: Arc<ItemFactory>,
    pub(crate) modified: bool,
}

impl InventoryGrid {
    /// Create an empty grid
    pub fn new(
        save_id: impl Into<String>,
        grid_type: GridType,
        size: Footprint,
        layout: GridLayout,
        factory: Arc<ItemFactory>,
    ) -> Self {
        Self {
            id: factory.next_grid_id(),
            save_id: save_id.into(),
            grid_type,
            layout,
            store: GridOccupancyStore::new(size.w, size.h),
            factory,
            modified: false,
        }
    }

    /// Runtime id
    pub fn id(&self) -> GridId {
        self.id
    }

    /// Id used in the save graph
    pub fn key(&self) -> &str {
        &self.save_id
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: GridLayout) {
        self.layout = layout;
    }

    /// Size in cells
    pub fn size(&self) -> Footprint {
        self.store.size()
    }

    /// Read access to the occupancy store
    pub fn store(&self) -> &GridOccupancyStore {
        &self.store
    }

    /// Map a screen point to a cell, clamped into the grid
    pub fn screen_to_cell(&self, point: ScreenPoint) -> CellPos {
        let cell = self.layout.cell_size.max(f32::EPSILON);
        let x = ((point.x - self.layout.origin.x) / cell).floor() as i32;
        let y = ((point.y - self.layout.origin.y) / cell).floor() as i32;
        let max_x = self.store.width().saturating_sub(1) as i32;
        let max_y = self.store.height().saturating_sub(1) as i32;
        CellPos::new(x.clamp(0, max_x), y.clamp(0, max_y))
    }

    /// Top-left screen point of a cell
    pub fn cell_to_screen(&self, cell: CellPos) -> ScreenPoint {
        ScreenPoint::new(
            self.layout.origin.x + cell.x as f32 * self.layout.cell_size,
            self.layout.origin.y + cell.y as f32 * self.layout.cell_size,
        )
    }

    /// Check if a footprint at `pos` stays inside the grid
    pub fn boundary_check(&self, pos: CellPos, size: Footprint) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.x as u64 + size.w as u64 <= self.store.width() as u64
            && pos.y as u64 + size.h as u64 <= self.store.height() as u64
    }

    /// Check if a footprint at `pos` covers no occupied cell, not counting
    /// cells held by `ignoring`
    pub fn overlap_check(&self, pos: CellPos, size: Footprint, ignoring: Option<ItemUid>) -> bool {
        let region = Region::new(pos, size);
        let ignored = ignoring.and_then(|uid| self.store.find(uid)).map(PlacedItem::region);

        region.cells().all(|cell| {
            !self.store.is_occupied(cell) || ignored.map(|r| r.contains(cell)).unwrap_or(false)
        })
    }

    /// Validate a placement without mutating anything
    pub fn check_placement(
        &self,
        pos: CellPos,
        size: Footprint,
        ignoring: Option<ItemUid>,
    ) -> Result<(), PlacementError> {
        if !self.boundary_check(pos, size) {
            return Err(PlacementError::OutOfBounds(pos));
        }
        if !self.overlap_check(pos, size, ignoring) {
            return Err(PlacementError::Overlap(pos));
        }
        Ok(())
    }

    /// Bounds and overlap check together
    pub fn can_place(&self, pos: CellPos, size: Footprint, ignoring: Option<ItemUid>) -> bool {
        self.check_placement(pos, size, ignoring).is_ok()
    }

    /// Place an item with its current orientation.
    ///
    /// On failure nothing changes and the item is handed back.
    pub fn place(&mut self, mut item: ItemInstance, pos: CellPos) -> Result<(), Rejected> {
        let size = item.footprint();
        if let Err(error) = self.check_placement(pos, size, None) {
            return Err(Rejected { error, item });
        }

        item.position = Some(pos);
        self.store.insert(PlacedItem {
            item,
            origin: pos,
            size,
        });
        self.modified = true;
        Ok(())
    }

    /// Unbind an item. Removing an absent item is a no-op.
    pub fn remove(&mut self, uid: ItemUid) -> Option<PlacedItem> {
        let placed = self.store.take(uid)?;
        self.modified = true;
        Some(placed)
    }

    /// Rotate a placed item in place, keeping its origin
    pub fn rotate_placed(&mut self, uid: ItemUid) -> Result<(), InventoryError> {
        let placed = self.store.find(uid).ok_or(InventoryError::MissingItem(uid))?;
        let origin = placed.origin;
        let size = placed.size.rotated();
        self.check_placement(origin, size, Some(uid))?;

        if let Some(mut placed) = self.store.take(uid) {
            placed.item.rotate();
            placed.size = placed.item.footprint();
            self.store.insert(placed);
            self.modified = true;
        }
        Ok(())
    }

    /// First free position in row-major order
    pub fn find_free_position(&self, size: Footprint) -> Option<CellPos> {
        if size.w > self.store.width() || size.h > self.store.height() {
            return None;
        }

        for y in 0..=(self.store.height() - size.h) as i32 {
            for x in 0..=(self.store.width() - size.w) as i32 {
                let pos = CellPos::new(x, y);
                if self.overlap_check(pos, size, None) {
                    return Some(pos);
                }
            }
        }
        None
    }

    /// Place an item at the first free position, trying it unrotated first
    /// and then rotated. On failure the item comes back in its original
    /// orientation.
    pub fn auto_place(&mut self, mut item: ItemInstance) -> Result<CellPos, Rejected> {
        let original = item.rotated;

        for rotated in [false, true] {
            item.set_rotated(rotated);
            if rotated && item.footprint().is_square() {
                break;
            }
            if let Some(pos) = self.find_free_position(item.footprint()) {
                return self.place(item, pos).map(|()| pos);
            }
        }

        item.set_rotated(original);
        Err(Rejected {
            error: PlacementError::Overlap(CellPos::default()),
            item,
        })
    }

    /// Item covering a cell
    pub fn item_at(&self, cell: CellPos) -> Option<ItemUid> {
        self.store.item_at(cell.x, cell.y)
    }

    /// Placed record by uid
    pub fn get(&self, uid: ItemUid) -> Option<&PlacedItem> {
        self.store.find(uid)
    }

    /// Mutable item by uid. Footprint fields must not be changed through it.
    pub fn item_mut(&mut self, uid: ItemUid) -> Option<&mut ItemInstance> {
        let placed = self.store.find_mut(uid)?;
        self.modified = true;
        Some(&mut placed.item)
    }

    /// All placed records
    pub fn items(&self) -> impl Iterator<Item = &PlacedItem> {
        self.store.placed().iter()
    }

    /// Number of placed items
    pub fn item_count(&self) -> usize {
        self.store.placed().len()
    }

    /// Total units of `item_id` held by this grid
    pub fn count_of(&self, item_id: &str) -> u32 {
        self.items()
            .filter(|p| p.item.item_id == item_id)
            .map(|p| p.item.current_stack)
            .sum()
    }

    /// Stacks of `item_id` with room left
    pub(crate) fn open_stacks(&self, item_id: &str) -> Vec<ItemUid> {
        self.items()
            .filter(|p| p.item.item_id == item_id && p.item.is_stackable() && p.item.space_left() > 0)
            .map(PlacedItem::uid)
            .collect()
    }

    /// Remove everything, returning the items
    pub fn clear(&mut self) -> Vec<ItemInstance> {
        let items: Vec<ItemInstance> = self.store.drain().into_iter().map(|p| p.item).collect();
        if !items.is_empty() {
            self.modified = true;
        }
        items
    }

    /// Forget pending modifications after a successful save
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemCatalog, ItemCategory, ItemDefinition};

    fn factory() -> Arc<ItemFactory> {
        Arc::new(ItemFactory::new(ItemCatalog::from_definitions([
            ItemDefinition::new("box", "Box").with_size(2, 2),
            ItemDefinition::new("rifle", "Rifle")
                .with_category(ItemCategory::Weapon)
                .with_size(3, 1),
            ItemDefinition::new("long", "Long Case").with_size(4, 1),
            ItemDefinition::new("ammo", "Ammo")
                .with_category(ItemCategory::Ammo)
                .with_max_stack(10),
        ])))
    }

    fn grid(w: u32, h: u32) -> InventoryGrid {
        InventoryGrid::new(
            "grid.test",
            GridType::Main,
            Footprint::new(w, h),
            GridLayout::default(),
            factory(),
        )
    }

    #[test]
    fn test_place_and_overlap() {
        let mut grid = grid(4, 4);
        let a = grid.factory.create("box", 1).unwrap();
        let a_uid = a.uid;
        grid.place(a, CellPos::new(0, 0)).unwrap();
        assert_eq!(grid.store().occupied_count(), 4);

        let b = grid.factory.create("box", 1).unwrap();
        let rejected = grid.place(b, CellPos::new(1, 1)).unwrap_err();
        assert_eq!(rejected.error, PlacementError::Overlap(CellPos::new(1, 1)));
        assert_eq!(grid.store().occupied_count(), 4);

        grid.place(rejected.item, CellPos::new(2, 2)).unwrap();
        assert_eq!(grid.store().occupied_count(), 8);
        assert_eq!(grid.item_at(CellPos::new(1, 1)), Some(a_uid));
        assert!(grid.store().check_invariant());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = grid(4, 4);
        let rifle = grid.factory.create("rifle", 1).unwrap();

        let rejected = grid.place(rifle, CellPos::new(2, 0)).unwrap_err();
        assert_eq!(rejected.error, PlacementError::OutOfBounds(CellPos::new(2, 0)));
        assert!(!grid.boundary_check(CellPos::new(-1, 0), Footprint::new(1, 1)));
        assert!(grid.boundary_check(CellPos::new(3, 3), Footprint::new(1, 1)));
    }

    #[test]
    fn test_remove_idempotent() {
        let mut grid = grid(4, 4);
        let item = grid.factory.create("box", 1).unwrap();
        let uid = item.uid;
        grid.place(item, CellPos::new(0, 0)).unwrap();

        assert!(grid.remove(uid).is_some());
        let after_first = grid.store().occupied_count();
        assert!(grid.remove(uid).is_none());
        assert_eq!(grid.store().occupied_count(), after_first);
        assert_eq!(after_first, 0);
    }

    #[test]
    fn test_screen_mapping_clamps() {
        let mut grid = grid(4, 4);
        grid.set_layout(GridLayout {
            origin: ScreenPoint::new(100.0, 100.0),
            cell_size: 50.0,
        });

        assert_eq!(grid.screen_to_cell(ScreenPoint::new(175.0, 260.0)), CellPos::new(1, 3));
        assert_eq!(grid.screen_to_cell(ScreenPoint::new(0.0, 0.0)), CellPos::new(0, 0));
        assert_eq!(grid.screen_to_cell(ScreenPoint::new(900.0, 120.0)), CellPos::new(3, 0));
        assert_eq!(grid.cell_to_screen(CellPos::new(2, 1)), ScreenPoint::new(200.0, 150.0));
    }

    #[test]
    fn test_find_free_position_row_major() {
        let mut grid = grid(4, 4);
        let a = grid.factory.create("box", 1).unwrap();
        grid.place(a, CellPos::new(0, 0)).unwrap();

        assert_eq!(grid.find_free_position(Footprint::new(2, 2)), Some(CellPos::new(2, 0)));
        assert_eq!(grid.find_free_position(Footprint::new(1, 1)), Some(CellPos::new(2, 0)));
        assert_eq!(grid.find_free_position(Footprint::new(5, 1)), None);
    }

    #[test]
    fn test_auto_place_rotates() {
        let mut grid = grid(2, 4);
        let long = grid.factory.create("long", 1).unwrap();

        let pos = grid.auto_place(long).unwrap();
        assert_eq!(pos, CellPos::new(0, 0));
        let placed = grid.items().next().unwrap();
        assert!(placed.item.rotated);
        assert_eq!(placed.size, Footprint::new(1, 4));
    }

    #[test]
    fn test_auto_place_failure_restores_orientation() {
        let mut grid = grid(2, 2);
        let long = grid.factory.create("long", 1).unwrap();

        let rejected = grid.auto_place(long).unwrap_err();
        assert!(!rejected.item.rotated);
        assert_eq!(rejected.item.footprint(), Footprint::new(4, 1));
        assert_eq!(grid.item_count(), 0);
    }

    #[test]
    fn test_rotate_placed() {
        let mut grid = grid(4, 4);
        let rifle = grid.factory.create("rifle", 1).unwrap();
        let uid = rifle.uid;
        grid.place(rifle, CellPos::new(0, 0)).unwrap();

        grid.rotate_placed(uid).unwrap();
        assert_eq!(grid.get(uid).unwrap().size, Footprint::new(1, 3));
        assert_eq!(grid.item_at(CellPos::new(0, 2)), Some(uid));
        assert_eq!(grid.item_at(CellPos::new(1, 0)), None);

        // Blocked rotation leaves the item as it was
        let blocker = grid.factory.create("box", 1).unwrap();
        grid.place(blocker, CellPos::new(1, 0)).unwrap();
        assert!(grid.rotate_placed(uid).is_err());
        assert_eq!(grid.get(uid).unwrap().size, Footprint::new(1, 3));
        assert!(grid.store().check_invariant());
    }

    #[test]
    fn test_count_and_open_stacks() {
        let mut grid = grid(4, 4);
        let full = grid.factory.create("ammo", 10).unwrap();
        let part = grid.factory.create("ammo", 4).unwrap();
        let part_uid = part.uid;
        grid.auto_place(full).unwrap();
        grid.auto_place(part).unwrap();

        assert_eq!(grid.count_of("ammo"), 14);
        assert_eq!(grid.open_stacks("ammo"), vec![part_uid]);
    }
}
