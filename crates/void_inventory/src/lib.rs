//! Void Inventory - Grid Inventory System
//!
//! This crate provides a tile-based inventory in the style of extraction
//! shooters: items occupy rectangles on 2D grids, can be rotated, stacked
//! and dragged between grids and equipment slots, and container items
//! spawn their own grid while equipped.
//!
//! # Features
//!
//! - Cell occupancy grids with boundary and overlap checks
//! - Placement with rotation and first-fit search
//! - Stack merging and splitting
//! - Equipment slots with category filters and child grids
//! - Drag-and-drop with live preview, merge, swap and revert
//! - Dependency-ordered save and restore through `void_gamestate`
//!
//! # Example
//!
//! ```ignore
//! use void_inventory::prelude::*;
//!
//! let config = InventoryConfig::load();
//! let mut ctx = AppContext::from_config(config);
//! let mut inventory = InventoryController::new(&mut ctx)?;
//!
//! let main = inventory.main_grid_id();
//! inventory.add_item(main, "ammo_545", 90)?;
//! inventory.save(&mut ctx, "slot1")?;
//! ```

pub mod config;
pub mod controller;
pub mod drag;
pub mod equipment;
pub mod error;
pub mod events;
pub mod grid;
pub mod item;
pub mod persist;
pub mod placement;
pub mod stack;
pub mod ui_state;

pub mod prelude {
    pub use crate::config::{ConfigError, ContainerOrigins, InventoryConfig, MainGridConfig};
    pub use crate::controller::{AppContext, InputState, InventoryController, PointerTarget};
    pub use crate::drag::{DragOrigin, DragSession, DropOutcome, PreviewState, PreviewTarget};
    pub use crate::equipment::{EquipmentSlot, SlotKind, SlotState};
    pub use crate::error::{EquipRejected, InventoryError, InventoryResult, PlacementError, Rejected};
    pub use crate::events::InventoryEvent;
    pub use crate::grid::{CellPos, Footprint, GridId, GridOccupancyStore, GridType, PlacedItem, Region};
    pub use crate::item::{ItemCatalog, ItemCategory, ItemDefinition, ItemFactory, ItemInstance, ItemUid};
    pub use crate::persist::{
        GridSnapshot, ItemEntry, LayoutTable, CATALOG_ID, CONTAINER_UI_ID, CONTROLLER_ID, LAYOUT_ID,
        MAIN_GRID_ID, UI_STATE_ID,
    };
    pub use crate::placement::{GridLayout, InventoryGrid, ScreenPoint};
    pub use crate::stack::{MergeOutcome, StackMergeResolver};
    pub use crate::ui_state::{ContainerUiState, PanelState, UiState};
}

pub use prelude::*;
