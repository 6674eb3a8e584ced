//! Inventory events

use crate::equipment::SlotKind;
use crate::grid::GridId;
use crate::item::ItemUid;

/// Events emitted by the inventory controller, drained once per frame
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryEvent {
    /// Occupancy of a grid changed
    GridChanged(GridId),
    /// The save graph published a new order
    SaveOrderComputed(Vec<String>),
    /// A stack was fully merged into another and no longer exists
    ItemDestroyed { uid: ItemUid, item_id: String, amount: u32 },
    /// An item was bound to a slot
    Equipped { slot: SlotKind, item_id: String },
    /// An item was removed from a slot
    Unequipped { slot: SlotKind, item_id: String },
    /// A weapon was equipped; forwarded to the game's message bus
    WeaponEquipped { slot: SlotKind, item_id: String },
    /// A container's grid was spawned
    GridSpawned { slot: SlotKind, grid: GridId },
    /// A container's grid was written into its item and destroyed
    GridFlushed { slot: SlotKind, grid: GridId },
    /// Pointer focus moved to another grid
    FocusChanged(Option<GridId>),
    /// An item could not be bound anywhere and was parked on the controller
    ItemUnbound { uid: ItemUid, item_id: String },
}
