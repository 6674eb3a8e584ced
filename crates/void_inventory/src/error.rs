//! Inventory errors

use crate::equipment::SlotKind;
use crate::grid::{CellPos, GridId};
use crate::item::{ItemCategory, ItemInstance, ItemUid};
use thiserror::Error;
use void_gamestate::{DependencyError, SaveError};

/// Why an item cannot go where it was asked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("footprint at {0} leaves the grid")]
    OutOfBounds(CellPos),
    #[error("footprint at {0} overlaps another item")]
    Overlap(CellPos),
}

/// A failed placement. The grid hands the item back untouched.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Rejected {
    pub error: PlacementError,
    pub item: ItemInstance,
}

/// A failed equip. The slot hands the item back untouched.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct EquipRejected {
    pub error: InventoryError,
    pub item: ItemInstance,
}

/// Inventory errors
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error("{slot:?} slot does not accept {category:?}")]
    TypeMismatch { slot: SlotKind, category: ItemCategory },

    #[error("{0:?} slot is already occupied")]
    SlotOccupied(SlotKind),

    #[error("no grid with id {0}")]
    MissingGrid(GridId),

    #[error("no item {0} in grid")]
    MissingItem(ItemUid),

    #[error("no free space for item '{0}'")]
    NoSpace(String),

    #[error("unknown item id '{0}'")]
    UnknownItem(String),

    #[error("cannot split {amount} from a stack of {stack}")]
    InvalidSplit { amount: u32, stack: u32 },

    #[error("save graph error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("save error: {0}")]
    Save(#[from] SaveError),
}

/// Result type for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;
