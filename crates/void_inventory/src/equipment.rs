//! Equipment slots
//!
//! A slot holds at most one item of its accepted category. Equipping a
//! container spawns a child grid that the slot owns and registers with the
//! save graph; unequipping flushes that grid into the item and destroys it.

use crate::error::{EquipRejected, InventoryError};
use crate::grid::{GridId, GridType};
use crate::item::{ItemCategory, ItemFactory, ItemInstance};
use crate::placement::{GridLayout, InventoryGrid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use void_gamestate::{Persistable, SaveDependencyGraph, SavePriority};

/// Equipment slot types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Main weapon
    PrimaryWeapon,
    /// Sidearm or second long gun
    SecondaryWeapon,
    /// Head armor
    Helmet,
    /// Body armor
    BodyArmor,
    /// Back slot, spawns a grid
    Backpack,
    /// Chest rig, spawns a grid
    TacticalRig,
}

impl SlotKind {
    /// Get all slots
    pub fn all() -> [Self; 6] {
        [
            Self::PrimaryWeapon,
            Self::SecondaryWeapon,
            Self::Helmet,
            Self::BodyArmor,
            Self::Backpack,
            Self::TacticalRig,
        ]
    }

    /// Category of items this slot accepts
    pub fn accepted_category(&self) -> ItemCategory {
        match self {
            Self::PrimaryWeapon | Self::SecondaryWeapon => ItemCategory::Weapon,
            Self::Helmet => ItemCategory::Helmet,
            Self::BodyArmor => ItemCategory::BodyArmor,
            Self::Backpack => ItemCategory::Backpack,
            Self::TacticalRig => ItemCategory::TacticalRig,
        }
    }

    /// Check if this is a weapon slot
    pub fn is_weapon(&self) -> bool {
        matches!(self, Self::PrimaryWeapon | Self::SecondaryWeapon)
    }

    /// Type of the grid spawned by a container in this slot
    pub fn child_grid_type(&self) -> Option<GridType> {
        match self {
            Self::Backpack => Some(GridType::Backpack),
            Self::TacticalRig => Some(GridType::TacticalRig),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryWeapon => "primary_weapon",
            Self::SecondaryWeapon => "secondary_weapon",
            Self::Helmet => "helmet",
            Self::BodyArmor => "body_armor",
            Self::Backpack => "backpack",
            Self::TacticalRig => "tactical_rig",
        }
    }

    /// Save-graph id of the slot
    pub fn save_id(&self) -> String {
        format!("slot.{}", self.name())
    }

    /// Save-graph id of the child grid
    pub fn child_save_id(&self) -> String {
        format!("grid.{}", self.name())
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Occupied,
}

/// One equipment slot and the grid its container spawned
#[derive(Debug)]
pub struct EquipmentSlot {
    kind: SlotKind,
    save_id: String,
    equipped: Option<ItemInstance>,
    child: Option<InventoryGrid>,
    child_layout: GridLayout,
    factory: Arc<ItemFactory>,
    pub(crate) modified: bool,
}

impl EquipmentSlot {
    /// Create an empty slot
    pub fn new(kind: SlotKind, child_layout: GridLayout, factory: Arc<ItemFactory>) -> Self {
        Self {
            kind,
            save_id: kind.save_id(),
            equipped: None,
            child: None,
            child_layout,
            factory,
            modified: false,
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Id used in the save graph
    pub fn key(&self) -> &str {
        &self.save_id
    }

    pub fn state(&self) -> SlotState {
        if self.equipped.is_some() {
            SlotState::Occupied
        } else {
            SlotState::Empty
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equipped.is_none()
    }

    /// Equipped item
    pub fn equipped(&self) -> Option<&ItemInstance> {
        self.equipped.as_ref()
    }

    /// Grid spawned by the equipped container
    pub fn child_grid(&self) -> Option<&InventoryGrid> {
        self.child.as_ref()
    }

    pub fn child_grid_mut(&mut self) -> Option<&mut InventoryGrid> {
        self.child.as_mut()
    }

    /// Screen layout for spawned grids
    pub fn set_child_layout(&mut self, layout: GridLayout) {
        self.child_layout = layout;
        if let Some(grid) = &mut self.child {
            grid.set_layout(layout);
        }
    }

    /// Check if the slot takes this item's category
    pub fn accepts(&self, item: &ItemInstance) -> bool {
        item.category == self.kind.accepted_category()
    }

    /// Check whether `item` could be equipped right now
    pub fn check_equip(&self, item: &ItemInstance) -> Result<(), InventoryError> {
        if !self.accepts(item) {
            return Err(InventoryError::TypeMismatch {
                slot: self.kind,
                category: item.category,
            });
        }
        if self.equipped.is_some() {
            return Err(InventoryError::SlotOccupied(self.kind));
        }
        Ok(())
    }

    /// Bind an item to the empty slot.
    ///
    /// A container gets a fresh child grid which is registered with the
    /// save graph after the slot state is updated. Returns the child grid id.
    pub fn equip(
        &mut self,
        mut item: ItemInstance,
        graph: &mut SaveDependencyGraph,
    ) -> Result<Option<GridId>, EquipRejected> {
        if let Err(error) = self.check_equip(&item) {
            return Err(EquipRejected { error, item });
        }

        item.set_rotated(false);
        item.position = None;
        self.child = self.spawn_child(&mut item);
        log::debug!("Equipped {} '{}' in {}", item.uid, item.item_id, self.kind);
        self.equipped = Some(item);
        self.modified = true;

        let Some(grid) = &self.child else {
            return Ok(None);
        };
        if let Err(e) = graph.register(
            grid.key(),
            SavePriority::GridContents,
            [self.save_id.clone()],
        ) {
            log::error!("Failed to register grid '{}': {}", grid.key(), e);
        }
        Ok(Some(grid.id()))
    }

    /// Unbind the equipped item.
    ///
    /// The child grid is serialized into the item's `contents`, removed from
    /// the save graph and dropped.
    pub fn unequip(&mut self, graph: &mut SaveDependencyGraph) -> Option<ItemInstance> {
        let mut item = self.equipped.take()?;
        self.modified = true;

        if let Some(grid) = self.child.take() {
            // An empty grid leaves any unreplayed blob on the item
            if grid.item_count() > 0 {
                match grid.serialize() {
                    Ok(blob) => item.contents = Some(blob),
                    Err(e) => log::error!("Failed to flush grid '{}': {}", grid.key(), e),
                }
            }

            if graph.unregister(grid.key()).is_none() {
                log::warn!("Grid '{}' was not registered", grid.key());
            }
            log::debug!("Destroyed {} of {}", grid.id(), self.kind);
        }

        log::debug!("Unequipped {} '{}' from {}", item.uid, item.item_id, self.kind);
        Some(item)
    }

    /// Make the save graph match the current child grid
    pub fn sync_registration(&self, graph: &mut SaveDependencyGraph) {
        match &self.child {
            Some(grid) if !graph.contains(grid.key()) => {
                if let Err(e) = graph.register(
                    grid.key(),
                    SavePriority::GridContents,
                    [self.save_id.clone()],
                ) {
                    log::error!("Failed to register grid '{}': {}", grid.key(), e);
                }
            }
            None => {
                let child_id = self.kind.child_save_id();
                if graph.contains(&child_id) {
                    graph.unregister(&child_id);
                }
            }
            _ => {}
        }
    }

    /// Replace the slot contents while restoring. The save graph is synced
    /// separately once the restore pass is over.
    pub(crate) fn restore_equipped(&mut self, item: Option<ItemInstance>) {
        self.child = None;
        self.equipped = None;

        if let Some(mut item) = item {
            self.child = self.spawn_child(&mut item);
            self.equipped = Some(item);
        }
        self.modified = false;
    }

    pub(crate) fn factory(&self) -> &ItemFactory {
        &self.factory
    }

    /// Forget pending modifications after a successful save
    pub fn mark_saved(&mut self) {
        self.modified = false;
        if let Some(grid) = &mut self.child {
            grid.mark_saved();
        }
    }

    fn spawn_child(&self, item: &mut ItemInstance) -> Option<InventoryGrid> {
        if !item.is_container() {
            return None;
        }
        let grid_type = self.kind.child_grid_type()?;
        let capacity = item.capacity?;

        let mut grid = InventoryGrid::new(
            self.kind.child_save_id(),
            grid_type,
            capacity,
            self.child_layout,
            Arc::clone(&self.factory),
        );

        if let Some(blob) = item.contents.take() {
            if let Err(e) = grid.deserialize(&blob) {
                log::warn!("Could not replay contents of {}: {}", item.uid, e);
                item.contents = Some(blob);
            }
        }
        grid.modified = true;
        log::debug!("Spawned {} ({}x{}) for {}", grid.id(), capacity.w, capacity.h, self.kind);
        Some(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellPos;
    use crate::item::{ItemCatalog, ItemDefinition};

    fn factory() -> Arc<ItemFactory> {
        Arc::new(ItemFactory::new(ItemCatalog::from_definitions([
            ItemDefinition::new("ak74", "AK-74")
                .with_category(ItemCategory::Weapon)
                .with_size(4, 2),
            ItemDefinition::new("pilgrim", "Pilgrim")
                .with_category(ItemCategory::Backpack)
                .with_size(3, 3)
                .with_capacity(5, 5),
            ItemDefinition::new("water", "Water").with_category(ItemCategory::Consumable),
        ])))
    }

    #[test]
    fn test_slot_categories() {
        assert_eq!(SlotKind::PrimaryWeapon.accepted_category(), ItemCategory::Weapon);
        assert_eq!(SlotKind::Backpack.save_id(), "slot.backpack");
        assert_eq!(SlotKind::TacticalRig.child_save_id(), "grid.tactical_rig");
        assert!(SlotKind::Helmet.child_grid_type().is_none());
    }

    #[test]
    fn test_type_mismatch() {
        let factory = factory();
        let mut graph = SaveDependencyGraph::new();
        let mut slot = EquipmentSlot::new(SlotKind::Helmet, GridLayout::default(), factory.clone());

        let gun = factory.create("ak74", 1).unwrap();
        let rejected = slot.equip(gun, &mut graph).unwrap_err();
        assert!(matches!(rejected.error, InventoryError::TypeMismatch { .. }));
        assert_eq!(rejected.item.item_id, "ak74");
        assert_eq!(slot.state(), SlotState::Empty);
    }

    #[test]
    fn test_occupied_rejects() {
        let factory = factory();
        let mut graph = SaveDependencyGraph::new();
        let mut slot =
            EquipmentSlot::new(SlotKind::PrimaryWeapon, GridLayout::default(), factory.clone());

        slot.equip(factory.create("ak74", 1).unwrap(), &mut graph).unwrap();
        let rejected = slot.equip(factory.create("ak74", 1).unwrap(), &mut graph).unwrap_err();
        assert!(matches!(rejected.error, InventoryError::SlotOccupied(_)));
    }

    #[test]
    fn test_container_lifecycle() {
        let factory = factory();
        let mut graph = SaveDependencyGraph::new();
        graph
            .register("slot.backpack", SavePriority::EquipmentSlot, Vec::<String>::new())
            .unwrap();
        let mut slot = EquipmentSlot::new(SlotKind::Backpack, GridLayout::default(), factory.clone());

        let grid_id = slot
            .equip(factory.create("pilgrim", 1).unwrap(), &mut graph)
            .unwrap()
            .unwrap();
        assert_eq!(slot.child_grid().unwrap().id(), grid_id);
        assert_eq!(slot.child_grid().unwrap().size().w, 5);
        assert!(graph.contains("grid.backpack"));
        assert_eq!(graph.save_order(), ["slot.backpack", "grid.backpack"]);

        let item = slot.unequip(&mut graph).unwrap();
        assert_eq!(item.item_id, "pilgrim");
        assert!(item.contents.is_none());
        assert!(slot.child_grid().is_none());
        assert!(!graph.contains("grid.backpack"));
        assert_eq!(graph.save_order(), ["slot.backpack"]);
    }

    #[test]
    fn test_contents_survive_reequip() {
        let factory = factory();
        let mut graph = SaveDependencyGraph::new();
        let mut slot = EquipmentSlot::new(SlotKind::Backpack, GridLayout::default(), factory.clone());

        slot.equip(factory.create("pilgrim", 1).unwrap(), &mut graph).unwrap();
        let water = factory.create("water", 1).unwrap();
        slot.child_grid_mut().unwrap().place(water, CellPos::new(2, 3)).unwrap();

        let pack = slot.unequip(&mut graph).unwrap();
        assert!(pack.contents.is_some());

        let new_id = slot.equip(pack, &mut graph).unwrap().unwrap();
        let grid = slot.child_grid().unwrap();
        assert_eq!(grid.id(), new_id);
        assert_eq!(grid.count_of("water"), 1);
        assert!(grid.item_at(CellPos::new(2, 3)).is_some());
        assert!(slot.equipped().unwrap().contents.is_none());
    }

    #[test]
    fn test_unreadable_contents_kept() {
        let factory = factory();
        let mut graph = SaveDependencyGraph::new();
        let mut slot = EquipmentSlot::new(SlotKind::Backpack, GridLayout::default(), factory.clone());

        let mut pack = factory.create("pilgrim", 1).unwrap();
        pack.contents = Some("not json".into());
        slot.equip(pack, &mut graph).unwrap().unwrap();
        assert_eq!(slot.child_grid().unwrap().item_count(), 0);
        assert_eq!(slot.equipped().unwrap().contents.as_deref(), Some("not json"));

        let pack = slot.unequip(&mut graph).unwrap();
        assert_eq!(pack.contents.as_deref(), Some("not json"));
    }

    #[test]
    fn test_sync_registration() {
        let factory = factory();
        let mut graph = SaveDependencyGraph::new();
        let mut slot = EquipmentSlot::new(SlotKind::Backpack, GridLayout::default(), factory.clone());

        slot.restore_equipped(Some(factory.create("pilgrim", 1).unwrap()));
        assert!(!graph.contains("grid.backpack"));
        slot.sync_registration(&mut graph);
        assert!(graph.contains("grid.backpack"));

        slot.restore_equipped(None);
        slot.sync_registration(&mut graph);
        assert!(!graph.contains("grid.backpack"));
    }
}
