//! Save payloads of inventory entities
//!
//! Every entity writes an explicit serde struct; field names are part of the
//! save format.

use crate::equipment::{EquipmentSlot, SlotKind};
use crate::error::InventoryError;
use crate::grid::{CellPos, GridType};
use crate::item::{ItemCategory, ItemFactory, ItemInstance};
use crate::placement::{GridLayout, InventoryGrid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use void_gamestate::{from_payload, to_payload, Persistable, SaveError};

pub const CATALOG_ID: &str = "items.catalog";
pub const LAYOUT_ID: &str = "grids.layout";
pub const MAIN_GRID_ID: &str = "grid.main";
pub const CONTROLLER_ID: &str = "inventory.controller";
pub const UI_STATE_ID: &str = "ui.state";
pub const CONTAINER_UI_ID: &str = "ui.containers";

/// One item inside a grid payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEntry {
    pub item_id: String,
    pub stack: u32,
    pub position: [i32; 2],
    pub rotated: bool,
    /// Flushed grid of a container item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

impl ItemEntry {
    pub fn from_item(item: &ItemInstance) -> Self {
        let position = item.position.unwrap_or_default();
        Self {
            item_id: item.item_id.clone(),
            stack: item.current_stack,
            position: [position.x, position.y],
            rotated: item.rotated,
            contents: item.contents.clone(),
        }
    }

    pub fn cell(&self) -> CellPos {
        CellPos::new(self.position[0], self.position[1])
    }

    /// Rebuild a live item with a fresh uid
    pub fn into_item(self, factory: &ItemFactory) -> Result<ItemInstance, InventoryError> {
        let mut item = factory.create(&self.item_id, self.stack)?;
        item.set_rotated(self.rotated);
        item.position = Some(self.cell());
        item.contents = self.contents;
        Ok(item)
    }
}

/// Payload of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSnapshot {
    pub grid_type: GridType,
    pub size: [u32; 2],
    pub items: Vec<ItemEntry>,
}

impl GridSnapshot {
    pub fn capture(grid: &InventoryGrid) -> Self {
        let mut items: Vec<ItemEntry> = grid.items().map(|p| ItemEntry::from_item(&p.item)).collect();
        items.sort_by_key(|e| (e.position[1], e.position[0]));
        let size = grid.size();
        Self {
            grid_type: grid.grid_type(),
            size: [size.w, size.h],
            items,
        }
    }
}

fn corrupted(e: impl std::fmt::Display) -> SaveError {
    SaveError::Deserialization(e.to_string())
}

impl Persistable for InventoryGrid {
    fn save_id(&self) -> &str {
        self.key()
    }

    fn serialize(&self) -> Result<String, SaveError> {
        to_payload(&GridSnapshot::capture(self))
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        let snapshot: GridSnapshot = from_payload(payload)?;
        let size = self.size();
        if snapshot.grid_type != self.grid_type() || snapshot.size != [size.w, size.h] {
            return Err(SaveError::Corrupted(format!(
                "'{}' expects {:?} {}x{}, payload has {:?} {}x{}",
                self.key(),
                self.grid_type(),
                size.w,
                size.h,
                snapshot.grid_type,
                snapshot.size[0],
                snapshot.size[1]
            )));
        }

        self.clear();
        let factory = Arc::clone(&self.factory);
        for entry in snapshot.items {
            let cell = entry.cell();
            let item = match entry.into_item(&factory) {
                Ok(item) => item,
                Err(e) => {
                    log::warn!("Skipping saved item in '{}': {}", self.key(), e);
                    continue;
                }
            };

            if let Err(rejected) = self.place(item, cell) {
                log::warn!(
                    "Saved item {} does not fit at {} in '{}': {}",
                    rejected.item.item_id,
                    cell,
                    self.key(),
                    rejected.error
                );
                if let Err(rejected) = self.auto_place(rejected.item) {
                    log::warn!("Dropped {} while restoring '{}'", rejected.item.item_id, self.key());
                }
            }
        }

        self.modified = false;
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn validate(&self) -> bool {
        self.store().check_invariant()
    }
}

/// Item of an equipment slot payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquippedEntry {
    pub item_id: String,
    pub stack: u32,
}

/// Payload of an equipment slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub slot: SlotKind,
    pub equipped: Option<EquippedEntry>,
}

impl Persistable for EquipmentSlot {
    fn save_id(&self) -> &str {
        self.key()
    }

    fn serialize(&self) -> Result<String, SaveError> {
        to_payload(&SlotSnapshot {
            slot: self.kind(),
            equipped: self.equipped().map(|item| EquippedEntry {
                item_id: item.item_id.clone(),
                stack: item.current_stack,
            }),
        })
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        let snapshot: SlotSnapshot = from_payload(payload)?;
        if snapshot.slot != self.kind() {
            return Err(SaveError::Corrupted(format!(
                "'{}' got a payload for {}",
                self.key(),
                snapshot.slot
            )));
        }

        let item = match snapshot.equipped {
            Some(entry) => {
                let item = self.factory().create(&entry.item_id, entry.stack).map_err(corrupted)?;
                if !self.accepts(&item) {
                    return Err(corrupted(InventoryError::TypeMismatch {
                        slot: self.kind(),
                        category: item.category,
                    }));
                }
                Some(item)
            }
            None => None,
        };

        self.restore_equipped(item);
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn validate(&self) -> bool {
        let expects_grid = self.equipped().map(ItemInstance::is_container).unwrap_or(false);
        expects_grid == self.child_grid().is_some()
    }
}

/// One catalog entry as written to saves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub category: ItemCategory,
    pub size: [u32; 2],
    pub max_stack: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CatalogSnapshot {
    items: Vec<CatalogEntry>,
}

/// Persists the item catalog the save was written with.
///
/// The live catalog is immutable, so restoring only reports definitions
/// that changed since the save.
#[derive(Debug)]
pub struct CatalogRecord {
    factory: Arc<ItemFactory>,
}

impl CatalogRecord {
    pub fn new(factory: Arc<ItemFactory>) -> Self {
        Self { factory }
    }
}

impl Persistable for CatalogRecord {
    fn save_id(&self) -> &str {
        CATALOG_ID
    }

    fn serialize(&self) -> Result<String, SaveError> {
        let items = self
            .factory
            .catalog()
            .iter()
            .map(|def| CatalogEntry {
                id: def.id.clone(),
                category: def.category,
                size: [def.width, def.height],
                max_stack: def.max_stack,
            })
            .collect();
        to_payload(&CatalogSnapshot { items })
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        let snapshot: CatalogSnapshot = from_payload(payload)?;
        let catalog = self.factory.catalog();

        for entry in snapshot.items {
            match catalog.get(&entry.id) {
                None => log::warn!("Saved item '{}' is no longer defined", entry.id),
                Some(def)
                    if def.category != entry.category
                        || [def.width, def.height] != entry.size
                        || def.max_stack != entry.max_stack =>
                {
                    log::warn!("Item '{}' changed since the save was written", entry.id)
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn is_modified(&self) -> bool {
        false
    }

    fn validate(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LayoutSnapshot {
    grids: BTreeMap<String, GridLayout>,
}

/// Screen layout of every grid, keyed by grid save id
#[derive(Debug, Clone, Default)]
pub struct LayoutTable {
    grids: BTreeMap<String, GridLayout>,
    modified: bool,
}

impl LayoutTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, save_id: &str) -> Option<GridLayout> {
        self.grids.get(save_id).copied()
    }

    pub fn set(&mut self, save_id: impl Into<String>, layout: GridLayout) {
        let save_id = save_id.into();
        if self.grids.get(&save_id) != Some(&layout) {
            self.grids.insert(save_id, layout);
            self.modified = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, GridLayout)> {
        self.grids.iter().map(|(id, layout)| (id.as_str(), *layout))
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}

impl Persistable for LayoutTable {
    fn save_id(&self) -> &str {
        LAYOUT_ID
    }

    fn serialize(&self) -> Result<String, SaveError> {
        to_payload(&LayoutSnapshot {
            grids: self.grids.clone(),
        })
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        let snapshot: LayoutSnapshot = from_payload(payload)?;
        self.grids = snapshot.grids;
        self.modified = false;
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn validate(&self) -> bool {
        self.grids.values().all(|l| l.cell_size > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ControllerSnapshot {
    unbound: Vec<ItemEntry>,
}

/// Controller-owned state that is not bound to any grid
#[derive(Debug)]
pub struct ControllerRecord {
    /// Items that could go nowhere after a failed drop
    pub(crate) unbound: Vec<ItemInstance>,
    factory: Arc<ItemFactory>,
    pub(crate) modified: bool,
}

impl ControllerRecord {
    pub fn new(factory: Arc<ItemFactory>) -> Self {
        Self {
            unbound: Vec::new(),
            factory,
            modified: false,
        }
    }

    pub fn unbound(&self) -> &[ItemInstance] {
        &self.unbound
    }

    pub(crate) fn push(&mut self, item: ItemInstance) {
        self.unbound.push(item);
        self.modified = true;
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}

impl Persistable for ControllerRecord {
    fn save_id(&self) -> &str {
        CONTROLLER_ID
    }

    fn serialize(&self) -> Result<String, SaveError> {
        to_payload(&ControllerSnapshot {
            unbound: self.unbound.iter().map(ItemEntry::from_item).collect(),
        })
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        let snapshot: ControllerSnapshot = from_payload(payload)?;
        self.unbound.clear();
        for entry in snapshot.unbound {
            match entry.into_item(&self.factory) {
                Ok(item) => self.unbound.push(item),
                Err(e) => log::warn!("Skipping unbound item: {}", e),
            }
        }
        self.modified = false;
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn validate(&self) -> bool {
        self.unbound
            .iter()
            .all(|item| item.current_stack > 0 && item.current_stack <= item.max_stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Footprint;
    use crate::item::{ItemCatalog, ItemDefinition};
    use void_gamestate::SaveDependencyGraph;

    fn factory() -> Arc<ItemFactory> {
        Arc::new(ItemFactory::new(ItemCatalog::from_definitions([
            ItemDefinition::new("ammo", "Ammo")
                .with_category(ItemCategory::Ammo)
                .with_max_stack(30),
            ItemDefinition::new("ak74", "AK-74")
                .with_category(ItemCategory::Weapon)
                .with_size(4, 2),
            ItemDefinition::new("pilgrim", "Pilgrim")
                .with_category(ItemCategory::Backpack)
                .with_size(3, 3)
                .with_capacity(5, 5),
        ])))
    }

    fn main_grid(factory: &Arc<ItemFactory>) -> InventoryGrid {
        InventoryGrid::new(
            MAIN_GRID_ID,
            GridType::Main,
            Footprint::new(6, 6),
            GridLayout::default(),
            Arc::clone(factory),
        )
    }

    #[test]
    fn test_grid_payload_shape() {
        let factory = factory();
        let mut grid = main_grid(&factory);
        let mut gun = factory.create("ak74", 1).unwrap();
        gun.rotate();
        grid.place(gun, CellPos::new(1, 0)).unwrap();
        grid.place(factory.create("ammo", 12).unwrap(), CellPos::new(0, 0)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&grid.serialize().unwrap()).unwrap();
        assert_eq!(json["gridType"], "Main");
        assert_eq!(json["size"], serde_json::json!([6, 6]));
        assert_eq!(json["items"][0]["itemId"], "ammo");
        assert_eq!(json["items"][0]["stack"], 12);
        assert_eq!(json["items"][1]["position"], serde_json::json!([1, 0]));
        assert_eq!(json["items"][1]["rotated"], true);
        assert!(json["items"][1].get("contents").is_none());
    }

    #[test]
    fn test_grid_restore() {
        let factory = factory();
        let mut grid = main_grid(&factory);
        let mut gun = factory.create("ak74", 1).unwrap();
        gun.rotate();
        grid.place(gun, CellPos::new(1, 0)).unwrap();
        grid.place(factory.create("ammo", 12).unwrap(), CellPos::new(0, 0)).unwrap();
        let payload = grid.serialize().unwrap();

        let mut restored = main_grid(&factory);
        restored.deserialize(&payload).unwrap();
        assert_eq!(restored.count_of("ammo"), 12);
        let gun = restored.get(restored.item_at(CellPos::new(2, 3)).unwrap()).unwrap();
        assert_eq!(gun.item.item_id, "ak74");
        assert_eq!(gun.size, Footprint::new(2, 4));
        assert!(!restored.is_modified());
        assert!(restored.validate());
    }

    #[test]
    fn test_grid_restore_rejects_wrong_shape() {
        let factory = factory();
        let mut grid = main_grid(&factory);
        let payload = r#"{"gridType":"Backpack","size":[5,5],"items":[]}"#;
        assert!(grid.deserialize(payload).is_err());
    }

    #[test]
    fn test_grid_restore_skips_unknown_items() {
        let factory = factory();
        let mut grid = main_grid(&factory);
        let payload = r#"{"gridType":"Main","size":[6,6],"items":[
            {"itemId":"ghost","stack":1,"position":[0,0],"rotated":false},
            {"itemId":"ammo","stack":5,"position":[3,3],"rotated":false}
        ]}"#;

        grid.deserialize(payload).unwrap();
        assert_eq!(grid.item_count(), 1);
        assert!(grid.item_at(CellPos::new(3, 3)).is_some());
    }

    #[test]
    fn test_slot_round_trip() {
        let factory = factory();
        let mut graph = SaveDependencyGraph::new();
        let mut slot = EquipmentSlot::new(SlotKind::Backpack, GridLayout::default(), factory.clone());
        slot.equip(factory.create("pilgrim", 1).unwrap(), &mut graph).unwrap();
        let payload = slot.serialize().unwrap();

        let mut restored = EquipmentSlot::new(SlotKind::Backpack, GridLayout::default(), factory.clone());
        restored.deserialize(&payload).unwrap();
        assert_eq!(restored.equipped().unwrap().item_id, "pilgrim");
        assert!(restored.child_grid().is_some());
        assert!(restored.validate());

        let mut wrong = EquipmentSlot::new(SlotKind::Helmet, GridLayout::default(), factory);
        assert!(wrong.deserialize(&payload).is_err());
    }

    #[test]
    fn test_layout_table() {
        let mut table = LayoutTable::new();
        table.set(MAIN_GRID_ID, GridLayout::default());
        assert!(table.is_modified());

        let payload = table.serialize().unwrap();
        let mut restored = LayoutTable::new();
        restored.deserialize(&payload).unwrap();
        assert_eq!(restored.get(MAIN_GRID_ID), Some(GridLayout::default()));
        assert!(!restored.is_modified());
    }

    #[test]
    fn test_controller_record_round_trip() {
        let factory = factory();
        let mut record = ControllerRecord::new(factory.clone());
        let mut ammo = factory.create("ammo", 3).unwrap();
        ammo.position = Some(CellPos::new(4, 4));
        record.push(ammo);

        let payload = record.serialize().unwrap();
        let mut restored = ControllerRecord::new(factory);
        restored.deserialize(&payload).unwrap();
        assert_eq!(restored.unbound().len(), 1);
        assert_eq!(restored.unbound()[0].current_stack, 3);
        assert_eq!(restored.unbound()[0].position, Some(CellPos::new(4, 4)));
    }
}
