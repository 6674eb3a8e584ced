//! Item definitions and instances

use crate::error::InventoryError;
use crate::grid::{CellPos, Footprint, GridId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Item category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Firearms and melee weapons
    Weapon,
    /// Head armor
    Helmet,
    /// Body armor
    BodyArmor,
    /// Backpacks (containers)
    Backpack,
    /// Chest rigs (containers)
    TacticalRig,
    /// Ammunition
    Ammo,
    /// Medical supplies
    Medical,
    /// Food and drink
    Consumable,
    /// Crafting materials
    Material,
    /// Misc items
    Misc,
}

impl Default for ItemCategory {
    fn default() -> Self {
        Self::Misc
    }
}

impl ItemCategory {
    /// Check if items of this category carry their own grid when equipped
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Backpack | Self::TacticalRig)
    }
}

/// Item definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDefinition {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Category
    pub category: ItemCategory,
    /// Width in cells, unrotated
    pub width: u32,
    /// Height in cells, unrotated
    pub height: u32,
    /// Maximum stack size (1 = not stackable)
    pub max_stack: u32,
    /// Inner grid size for container items
    pub capacity: Option<Footprint>,
    /// Base value/price
    pub value: u32,
}

impl ItemDefinition {
    /// Create a new item definition
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: ItemCategory::default(),
            width: 1,
            height: 1,
            max_stack: 1,
            capacity: None,
            value: 0,
        }
    }

    /// Set category
    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = category;
        self
    }

    /// Set size in cells
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    /// Set max stack size
    pub fn with_max_stack(mut self, max: u32) -> Self {
        self.max_stack = max.max(1);
        self
    }

    /// Set inner grid size
    pub fn with_capacity(mut self, width: u32, height: u32) -> Self {
        self.capacity = Some(Footprint::new(width, height));
        self
    }

    /// Set value
    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    /// Check if stackable
    pub fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }

    /// Unrotated footprint
    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.width, self.height)
    }
}

impl Default for ItemDefinition {
    fn default() -> Self {
        Self::new("unknown", "Unknown Item")
    }
}

/// Immutable table of item definitions
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    definitions: BTreeMap<String, ItemDefinition>,
}

impl ItemCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of definitions. Later duplicates win.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ItemDefinition>) -> Self {
        let mut catalog = Self::new();
        for def in definitions {
            catalog.register(def);
        }
        catalog
    }

    /// Add a definition, replacing any with the same id
    pub fn register(&mut self, mut def: ItemDefinition) {
        // Definitions read from config skip the builder clamps
        def.width = def.width.max(1);
        def.height = def.height.max(1);
        def.max_stack = def.max_stack.max(1);

        let id = def.id.clone();
        if self.definitions.insert(id.clone(), def).is_some() {
            log::warn!("Item definition '{}' registered twice, keeping the latest", id);
        }
    }

    /// Look up a definition
    pub fn get(&self, id: &str) -> Option<&ItemDefinition> {
        self.definitions.get(id)
    }

    /// Check if an id is known
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Iterate definitions in id order
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.definitions.values()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Unique id of a live item instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemUid(pub(crate) u64);

impl ItemUid {
    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// A concrete item. Owned by exactly one holder at a time: a grid, an
/// equipment slot, the drag session, or the controller's unbound list.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInstance {
    pub uid: ItemUid,
    pub item_id: String,
    pub category: ItemCategory,
    /// Current width, rotation applied
    pub width: u32,
    /// Current height, rotation applied
    pub height: u32,
    pub max_stack: u32,
    pub current_stack: u32,
    pub rotated: bool,
    /// Last known grid origin
    pub position: Option<CellPos>,
    /// Inner grid size for containers
    pub capacity: Option<Footprint>,
    /// Serialized inner grid of an unequipped container
    pub contents: Option<String>,
}

impl ItemInstance {
    /// Instantiate a definition
    pub fn from_definition(uid: ItemUid, def: &ItemDefinition, quantity: u32) -> Self {
        let max_stack = def.max_stack.max(1);
        Self {
            uid,
            item_id: def.id.clone(),
            category: def.category,
            width: def.width,
            height: def.height,
            max_stack,
            current_stack: quantity.clamp(1, max_stack),
            rotated: false,
            position: None,
            capacity: def.capacity,
            contents: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn blank(uid: ItemUid, item_id: &str) -> Self {
        Self::from_definition(uid, &ItemDefinition::new(item_id, item_id), 1)
    }

    /// Footprint with rotation applied
    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.width, self.height)
    }

    /// Swap width and height
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.width, &mut self.height);
        self.rotated = !self.rotated;
    }

    /// Rotate to the given orientation
    pub fn set_rotated(&mut self, rotated: bool) {
        if self.rotated != rotated {
            self.rotate();
        }
    }

    /// Check if stackable
    pub fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }

    /// Units this stack can still take
    pub fn space_left(&self) -> u32 {
        self.max_stack.saturating_sub(self.current_stack)
    }

    /// Add to this stack (returns overflow if any)
    pub fn add(&mut self, amount: u32) -> u32 {
        let to_add = amount.min(self.space_left());
        self.current_stack += to_add;
        amount - to_add
    }

    /// Check if this item spawns a grid when equipped
    pub fn is_container(&self) -> bool {
        self.category.is_container() && self.capacity.is_some()
    }
}

/// Creates item instances and hands out fresh ids.
///
/// Shared between the controller, grids and slots so that any of them can
/// rebuild items while restoring.
#[derive(Debug)]
pub struct ItemFactory {
    catalog: ItemCatalog,
    next_item: AtomicU64,
    next_grid: AtomicU64,
}

impl ItemFactory {
    /// Create a factory over a catalog
    pub fn new(catalog: ItemCatalog) -> Self {
        Self {
            catalog,
            next_item: AtomicU64::new(1),
            next_grid: AtomicU64::new(1),
        }
    }

    /// The item catalog
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Next unused item id
    pub fn next_uid(&self) -> ItemUid {
        ItemUid(self.next_item.fetch_add(1, Ordering::Relaxed))
    }

    /// Next unused grid id
    pub fn next_grid_id(&self) -> GridId {
        GridId(self.next_grid.fetch_add(1, Ordering::Relaxed))
    }

    /// Instantiate `item_id` with a clamped quantity
    pub fn create(&self, item_id: &str, quantity: u32) -> Result<ItemInstance, InventoryError> {
        let def = self
            .catalog
            .get(item_id)
            .ok_or_else(|| InventoryError::UnknownItem(item_id.to_string()))?;
        Ok(ItemInstance::from_definition(self.next_uid(), def, quantity))
    }
}
