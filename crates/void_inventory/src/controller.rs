//! Inventory controller
//!
//! Owns the main grid, the equipment slots, the drag session and the UI
//! state, and is the single entry point for input. Everything it needs from
//! the outside world lives in [`AppContext`], passed in explicitly.

use crate::config::InventoryConfig;
use crate::drag::{DragSession, DropOutcome};
use crate::equipment::{EquipmentSlot, SlotKind};
use crate::error::InventoryError;
use crate::events::InventoryEvent;
use crate::grid::{Footprint, GridId, GridType};
use crate::item::{ItemCatalog, ItemFactory, ItemInstance, ItemUid};
use crate::persist::{
    CatalogRecord, ControllerRecord, LayoutTable, CATALOG_ID, CONTAINER_UI_ID, CONTROLLER_ID,
    LAYOUT_ID, MAIN_GRID_ID, UI_STATE_ID,
};
use crate::placement::{InventoryGrid, ScreenPoint};
use crate::stack::StackMergeResolver;
use crate::ui_state::{ContainerUiState, UiState};
use std::sync::Arc;
use void_gamestate::{
    Persistable, RestoreReport, RestoreTarget, SaveData, SaveDependencyGraph, SaveManager,
    SavePriority, SaveReport, SaveSource,
};

const NO_DEPS: [&str; 0] = [];

/// Everything the inventory shares with the rest of the application
pub struct AppContext {
    pub config: InventoryConfig,
    pub factory: Arc<ItemFactory>,
    pub save_graph: SaveDependencyGraph,
    pub saves: SaveManager,
}

impl AppContext {
    /// Create a context with an explicit catalog
    pub fn new(config: InventoryConfig, catalog: ItemCatalog) -> Self {
        let saves = SaveManager::from_config(&config.save);
        Self {
            factory: Arc::new(ItemFactory::new(catalog)),
            save_graph: SaveDependencyGraph::new(),
            saves,
            config,
        }
    }

    /// Create a context whose catalog is the config's item list
    pub fn from_config(config: InventoryConfig) -> Self {
        let catalog = ItemCatalog::from_definitions(config.items.iter().cloned());
        Self::new(config, catalog)
    }
}

/// What the pointer is over, already resolved by the UI layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerTarget {
    Grid { grid: GridId, point: ScreenPoint },
    Slot(SlotKind),
    Outside,
}

/// One frame of polled input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputState {
    pub target: PointerTarget,
    /// Pointer went down this frame
    pub pressed: bool,
    /// Pointer went up this frame
    pub released: bool,
    /// Rotate key went down this frame
    pub rotate: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            target: PointerTarget::Outside,
            pressed: false,
            released: false,
            rotate: false,
        }
    }
}

/// Top-level inventory controller
pub struct InventoryController {
    pub(crate) factory: Arc<ItemFactory>,
    pub(crate) main: InventoryGrid,
    pub(crate) slots: Vec<EquipmentSlot>,
    pub(crate) drag: Option<DragSession>,
    pub(crate) record: ControllerRecord,
    pub(crate) catalog: CatalogRecord,
    pub(crate) layouts: LayoutTable,
    pub(crate) ui: UiState,
    pub(crate) panels: ContainerUiState,
    pub(crate) events: Vec<InventoryEvent>,
}

impl InventoryController {
    /// Build the grids and slots from the config, then register every
    /// persistable part with the save graph.
    pub fn new(ctx: &mut AppContext) -> Result<Self, InventoryError> {
        let factory = Arc::clone(&ctx.factory);
        let config = &ctx.config;

        let mut layouts = LayoutTable::new();
        layouts.set(MAIN_GRID_ID, config.main_layout());
        let main = InventoryGrid::new(
            MAIN_GRID_ID,
            GridType::Main,
            Footprint::new(config.main_grid.width, config.main_grid.height),
            config.main_layout(),
            Arc::clone(&factory),
        );

        let mut slots: Vec<EquipmentSlot> = Vec::new();
        for &kind in &config.slots {
            if slots.iter().any(|s| s.kind() == kind) {
                log::warn!("Slot {} listed twice in config", kind);
                continue;
            }
            let layout = config.container_layout(kind);
            if kind.child_grid_type().is_some() {
                layouts.set(kind.child_save_id(), layout);
            }
            slots.push(EquipmentSlot::new(kind, layout, Arc::clone(&factory)));
        }
        layouts.mark_saved();

        let graph = &mut ctx.save_graph;
        graph.register(CATALOG_ID, SavePriority::ItemData, NO_DEPS)?;
        graph.register(LAYOUT_ID, SavePriority::GridLayout, NO_DEPS)?;
        for slot in &slots {
            graph.register(slot.key(), SavePriority::EquipmentSlot, [CATALOG_ID])?;
        }
        graph.register(MAIN_GRID_ID, SavePriority::GridContents, [LAYOUT_ID, CATALOG_ID])?;
        graph.register(CONTROLLER_ID, SavePriority::Controller, [MAIN_GRID_ID])?;
        graph.register(UI_STATE_ID, SavePriority::UiState, [CONTROLLER_ID])?;
        graph.register(CONTAINER_UI_ID, SavePriority::ContainerUi, [UI_STATE_ID])?;

        let mut controller = Self {
            record: ControllerRecord::new(Arc::clone(&factory)),
            catalog: CatalogRecord::new(Arc::clone(&factory)),
            factory,
            main,
            slots,
            drag: None,
            layouts,
            ui: UiState::new(),
            panels: ContainerUiState::new(),
            events: Vec::new(),
        };
        controller.collect_save_orders(&mut ctx.save_graph);

        log::info!(
            "Inventory ready: {}x{} main grid, {} slots, {} item definitions",
            controller.main.size().w,
            controller.main.size().h,
            controller.slots.len(),
            controller.factory.catalog().len()
        );
        Ok(controller)
    }

    /// Unregister everything from the save graph. A carried item is put back
    /// first.
    pub fn shutdown(mut self, ctx: &mut AppContext) {
        if let Some(session) = self.drag.take() {
            let (item, origin) = session.into_parts();
            self.revert(ctx, item, origin);
        }

        let graph = &mut ctx.save_graph;
        for slot in &self.slots {
            graph.unregister(&slot.kind().child_save_id());
            graph.unregister(slot.key());
        }
        for id in [
            CONTAINER_UI_ID,
            UI_STATE_ID,
            CONTROLLER_ID,
            MAIN_GRID_ID,
            LAYOUT_ID,
            CATALOG_ID,
        ] {
            graph.unregister(id);
        }
        log::info!("Inventory shut down");
    }

    // -- input --------------------------------------------------------------

    /// Fold one frame of input into the pointer and key handlers.
    ///
    /// Returns the drop outcome when a drag ended this frame.
    pub fn tick(
        &mut self,
        ctx: &mut AppContext,
        input: &InputState,
    ) -> Option<DropOutcome> {
        let hovered = match input.target {
            PointerTarget::Grid { grid, .. } if self.grid(grid).is_some() => Some(grid),
            _ => None,
        };
        if self.ui.hover(hovered) {
            if let Some(grid) = hovered {
                let key = self.grid(grid).map(|g| g.key().to_string());
                self.ui.focus(key.as_deref());
            }
            self.events.push(InventoryEvent::FocusChanged(hovered));
        }

        if input.pressed {
            self.on_pointer_down(ctx, input.target);
        }
        if input.rotate {
            self.on_rotate_key();
        }

        if input.released && self.drag.is_some() {
            Some(self.on_pointer_up(ctx, input.target))
        } else {
            if self.drag.is_some() {
                self.on_pointer_move(input.target);
            }
            None
        }
    }

    // -- direct operations --------------------------------------------------

    /// Add `quantity` units of `item_id` to a grid.
    ///
    /// Existing stacks are topped up first, the rest goes into new stacks at
    /// the first free positions. Returns the number of units that did not fit.
    pub fn add_item(
        &mut self,
        grid: GridId,
        item_id: &str,
        quantity: u32,
    ) -> Result<u32, InventoryError> {
        let factory = Arc::clone(&self.factory);
        if !factory.catalog().contains(item_id) {
            return Err(InventoryError::UnknownItem(item_id.to_string()));
        }
        let target = self.grid_mut(grid).ok_or(InventoryError::MissingGrid(grid))?;

        let mut remaining = quantity;
        for uid in target.open_stacks(item_id) {
            if remaining == 0 {
                break;
            }
            if let Some(stack) = target.item_mut(uid) {
                remaining = stack.add(remaining);
            }
        }

        while remaining > 0 {
            let item = factory.create(item_id, remaining)?;
            let amount = item.current_stack;
            match target.auto_place(item) {
                Ok(pos) => {
                    log::debug!("Placed {} x{} at {}", item_id, amount, pos);
                    remaining -= amount;
                }
                Err(_) => break,
            }
        }

        if remaining < quantity {
            self.events.push(InventoryEvent::GridChanged(grid));
        }
        if remaining > 0 {
            log::warn!("{} x{} did not fit in {}", item_id, remaining, grid);
        }
        Ok(remaining)
    }

    /// Split `amount` units off a stack into a new stack in the same grid
    pub fn split_stack(
        &mut self,
        grid: GridId,
        uid: ItemUid,
        amount: u32,
    ) -> Result<ItemUid, InventoryError> {
        let factory = Arc::clone(&self.factory);
        let target = self.grid_mut(grid).ok_or(InventoryError::MissingGrid(grid))?;
        let source = target.get(uid).ok_or(InventoryError::MissingItem(uid))?;

        let stack = source.item.current_stack;
        if amount == 0 || amount >= stack {
            return Err(InventoryError::InvalidSplit { amount, stack });
        }

        let footprint = source.item.footprint();
        let (pos, rotate) = match target.find_free_position(footprint) {
            Some(pos) => (pos, false),
            None if !footprint.is_square() => match target.find_free_position(footprint.rotated()) {
                Some(pos) => (pos, true),
                None => return Err(InventoryError::NoSpace(source.item.item_id.clone())),
            },
            None => return Err(InventoryError::NoSpace(source.item.item_id.clone())),
        };

        let source = target.item_mut(uid).ok_or(InventoryError::MissingItem(uid))?;
        let mut split = StackMergeResolver::split(source, amount, factory.next_uid())?;
        if rotate {
            split.rotate();
        }
        let split_uid = split.uid;

        if let Err(rejected) = target.place(split, pos) {
            if let Some(source) = target.item_mut(uid) {
                source.current_stack += rejected.item.current_stack;
            }
            return Err(rejected.error.into());
        }

        self.events.push(InventoryEvent::GridChanged(grid));
        Ok(split_uid)
    }

    /// Rotate a placed item in place
    pub fn rotate_item(&mut self, grid: GridId, uid: ItemUid) -> Result<(), InventoryError> {
        self.grid_mut(grid)
            .ok_or(InventoryError::MissingGrid(grid))?
            .rotate_placed(uid)?;
        self.events.push(InventoryEvent::GridChanged(grid));
        Ok(())
    }

    /// Take an item out of the inventory. Removing an absent item is a no-op.
    pub fn remove_item(&mut self, grid: GridId, uid: ItemUid) -> Option<ItemInstance> {
        let Some(source) = self.grid_mut(grid) else {
            log::warn!("Remove from missing {}", grid);
            return None;
        };
        let placed = source.remove(uid)?;
        self.events.push(InventoryEvent::GridChanged(grid));
        Some(placed.item)
    }

    /// Try to put parked items back into a grid. Returns how many were placed.
    pub fn reclaim_unbound(&mut self, grid: GridId) -> usize {
        let items = std::mem::take(&mut self.record.unbound);
        if items.is_empty() {
            return 0;
        }

        let Some(target) = self.grid_mut(grid) else {
            log::warn!("Reclaim into missing {}", grid);
            self.record.unbound = items;
            return 0;
        };

        let mut left = Vec::new();
        let mut placed = 0;
        for item in items {
            match target.auto_place(item) {
                Ok(_) => placed += 1,
                Err(rejected) => left.push(rejected.item),
            }
        }

        self.record.unbound = left;
        self.record.modified = true;
        if placed > 0 {
            self.events.push(InventoryEvent::GridChanged(grid));
        }
        placed
    }

    // -- save / load --------------------------------------------------------

    /// Write every registered entity to `slot` in save order
    pub fn save(&mut self, ctx: &mut AppContext, slot: &str) -> Result<SaveReport, InventoryError> {
        self.collect_save_orders(&mut ctx.save_graph);
        let report = ctx.saves.save_pass(slot, &ctx.save_graph, &*self)?;
        self.mark_saved();
        Ok(report)
    }

    /// Quicksave to the default quicksave slot
    pub fn quicksave(&mut self, ctx: &mut AppContext) -> Result<SaveReport, InventoryError> {
        self.collect_save_orders(&mut ctx.save_graph);
        let report = ctx.saves.quicksave(&ctx.save_graph, &*self)?;
        self.mark_saved();
        Ok(report)
    }

    /// Save to the next rotating autosave slot
    pub fn autosave(&mut self, ctx: &mut AppContext) -> Result<SaveReport, InventoryError> {
        self.collect_save_orders(&mut ctx.save_graph);
        let report = ctx.saves.autosave(&ctx.save_graph, &*self)?;
        self.mark_saved();
        Ok(report)
    }

    /// Load `slot` and restore it
    pub fn load(&mut self, ctx: &mut AppContext, slot: &str) -> Result<RestoreReport, InventoryError> {
        let data = ctx.saves.load(slot)?;
        Ok(self.restore(ctx, &data))
    }

    /// Replay saved entries into the live inventory, then bring the save
    /// graph in line with the grids that now exist
    pub fn restore(&mut self, ctx: &mut AppContext, data: &SaveData) -> RestoreReport {
        if let Some(session) = self.drag.take() {
            let (item, origin) = session.into_parts();
            self.revert(ctx, item, origin);
        }

        let report = SaveManager::restore(data, self);

        let mut spawned = Vec::new();
        for slot in &self.slots {
            slot.sync_registration(&mut ctx.save_graph);
            if let Some(grid) = slot.child_grid() {
                spawned.push(grid.key().to_string());
            }
        }
        for key in spawned {
            if let Err(e) = ctx.save_graph.add_dependency(UI_STATE_ID, key.clone()) {
                log::error!("Failed to order '{}' before UI state: {}", key, e);
            }
        }

        for grid in self.grid_ids() {
            self.events.push(InventoryEvent::GridChanged(grid));
        }
        self.collect_save_orders(&mut ctx.save_graph);

        if report.is_complete() {
            log::info!("Restored {} entities", report.restored.len());
        } else {
            log::warn!(
                "Restore incomplete: {} restored, {} failed, {} missing",
                report.restored.len(),
                report.failed.len(),
                report.missing.len()
            );
        }
        report
    }

    // -- access -------------------------------------------------------------

    pub fn main_grid(&self) -> &InventoryGrid {
        &self.main
    }

    pub fn main_grid_id(&self) -> GridId {
        self.main.id()
    }

    /// Look up any live grid, static or spawned
    pub fn grid(&self, id: GridId) -> Option<&InventoryGrid> {
        if self.main.id() == id {
            return Some(&self.main);
        }
        self.slots
            .iter()
            .filter_map(EquipmentSlot::child_grid)
            .find(|g| g.id() == id)
    }

    pub(crate) fn grid_mut(&mut self, id: GridId) -> Option<&mut InventoryGrid> {
        if self.main.id() == id {
            return Some(&mut self.main);
        }
        self.slots
            .iter_mut()
            .filter_map(EquipmentSlot::child_grid_mut)
            .find(|g| g.id() == id)
    }

    /// Ids of every live grid
    pub fn grid_ids(&self) -> Vec<GridId> {
        std::iter::once(self.main.id())
            .chain(self.slots.iter().filter_map(|s| s.child_grid().map(InventoryGrid::id)))
            .collect()
    }

    pub fn slot(&self, kind: SlotKind) -> Option<&EquipmentSlot> {
        self.slots.iter().find(|s| s.kind() == kind)
    }

    pub(crate) fn slot_mut(&mut self, kind: SlotKind) -> Option<&mut EquipmentSlot> {
        self.slots.iter_mut().find(|s| s.kind() == kind)
    }

    pub fn slots(&self) -> &[EquipmentSlot] {
        &self.slots
    }

    /// Grid spawned by the container in `kind`
    pub fn container_grid(&self, kind: SlotKind) -> Option<&InventoryGrid> {
        self.slot(kind).and_then(EquipmentSlot::child_grid)
    }

    /// Items parked after a drop that could not be placed anywhere
    pub fn unbound_items(&self) -> &[ItemInstance] {
        self.record.unbound()
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    pub fn panels(&self) -> &ContainerUiState {
        &self.panels
    }

    pub fn panels_mut(&mut self) -> &mut ContainerUiState {
        &mut self.panels
    }

    pub fn layouts(&self) -> &LayoutTable {
        &self.layouts
    }

    pub fn factory(&self) -> &Arc<ItemFactory> {
        &self.factory
    }

    /// Total units of `item_id` across every grid, slot, the carried item and
    /// the unbound list
    pub fn total_count(&self, item_id: &str) -> u32 {
        let in_grids: u32 = self
            .grid_ids()
            .into_iter()
            .filter_map(|id| self.grid(id))
            .map(|g| g.count_of(item_id))
            .sum();
        let equipped: u32 = self
            .slots
            .iter()
            .filter_map(EquipmentSlot::equipped)
            .filter(|i| i.item_id == item_id)
            .map(|i| i.current_stack)
            .sum();
        let carried = self
            .drag
            .as_ref()
            .map(DragSession::item)
            .filter(|i| i.item_id == item_id)
            .map(|i| i.current_stack)
            .unwrap_or(0);
        let unbound: u32 = self
            .record
            .unbound()
            .iter()
            .filter(|i| i.item_id == item_id)
            .map(|i| i.current_stack)
            .sum();
        in_grids + equipped + carried + unbound
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<InventoryEvent> {
        std::mem::take(&mut self.events)
    }

    // -- internals ----------------------------------------------------------

    /// Forward every newly published save order as an event
    pub(crate) fn collect_save_orders(&mut self, graph: &mut SaveDependencyGraph) {
        for order in graph.drain_computed_orders() {
            self.events.push(InventoryEvent::SaveOrderComputed(order));
        }
    }

    fn apply_layouts(&mut self) {
        if let Some(layout) = self.layouts.get(MAIN_GRID_ID) {
            self.main.set_layout(layout);
        }
        for slot in &mut self.slots {
            if let Some(layout) = self.layouts.get(&slot.kind().child_save_id()) {
                slot.set_child_layout(layout);
            }
        }
    }

    fn mark_saved(&mut self) {
        self.main.mark_saved();
        for slot in &mut self.slots {
            slot.mark_saved();
        }
        self.record.mark_saved();
        self.layouts.mark_saved();
        self.ui.mark_saved();
        self.panels.mark_saved();
    }
}

impl SaveSource for InventoryController {
    fn persistable(&self, id: &str) -> Option<&dyn Persistable> {
        match id {
            CATALOG_ID => Some(&self.catalog),
            LAYOUT_ID => Some(&self.layouts),
            MAIN_GRID_ID => Some(&self.main),
            CONTROLLER_ID => Some(&self.record),
            UI_STATE_ID => Some(&self.ui),
            CONTAINER_UI_ID => Some(&self.panels),
            _ => self.slots.iter().find_map(|slot| {
                if slot.key() == id {
                    return Some(slot as &dyn Persistable);
                }
                slot.child_grid()
                    .filter(|g| g.key() == id)
                    .map(|g| g as &dyn Persistable)
            }),
        }
    }
}

impl RestoreTarget for InventoryController {
    fn persistable_mut(&mut self, id: &str) -> Option<&mut dyn Persistable> {
        match id {
            CATALOG_ID => Some(&mut self.catalog),
            LAYOUT_ID => Some(&mut self.layouts),
            MAIN_GRID_ID => Some(&mut self.main),
            CONTROLLER_ID => Some(&mut self.record),
            UI_STATE_ID => Some(&mut self.ui),
            CONTAINER_UI_ID => Some(&mut self.panels),
            _ => self.slots.iter_mut().find_map(|slot| {
                if slot.key() == id {
                    return Some(slot as &mut dyn Persistable);
                }
                slot.child_grid_mut()
                    .filter(|g| g.key() == id)
                    .map(|g| g as &mut dyn Persistable)
            }),
        }
    }

    fn restored(&mut self, id: &str) {
        if id == LAYOUT_ID {
            self.apply_layouts();
        }
    }
}
