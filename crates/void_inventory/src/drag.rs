//! Drag sessions
//!
//! Pointer-down lifts an item out of its grid or slot into a [`DragSession`].
//! Pointer-moves only update the preview. Pointer-up resolves the session in
//! one step: merge into a stack, place, equip or swap, and otherwise put the
//! item back where it came from. An item that cannot even go back is parked
//! on the controller instead of being lost.

use crate::controller::{AppContext, InventoryController, PointerTarget};
use crate::equipment::SlotKind;
use crate::events::InventoryEvent;
use crate::grid::{CellPos, Footprint, GridId};
use crate::item::{ItemInstance, ItemUid};
use crate::placement::{InventoryGrid, ScreenPoint};
use crate::persist::UI_STATE_ID;
use crate::stack::{MergeOutcome, StackMergeResolver};

/// Where a carried item was picked up
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOrigin {
    Grid {
        grid: GridId,
        cell: CellPos,
        rotated: bool,
    },
    Slot(SlotKind),
}

/// What the preview is showing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewTarget {
    Cell { grid: GridId, cell: CellPos },
    Slot(SlotKind),
}

/// Highlight state for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewState {
    pub target: PreviewTarget,
    /// Footprint of the carried item, rotation applied
    pub footprint: Footprint,
    /// A drop here would succeed
    pub can_place: bool,
    /// A drop here would merge into an existing stack
    pub merge: bool,
}

/// How a drop was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Placed on an empty area
    Placed { grid: GridId, cell: CellPos },
    /// Fully merged into `target`; the carried item no longer exists
    Absorbed { target: ItemUid, amount: u32 },
    /// Partly merged; the remainder went back to its origin
    Split {
        target: ItemUid,
        moved: u32,
        remainder: ItemUid,
    },
    /// Bound to an empty slot
    Equipped(SlotKind),
    /// Bound to an occupied slot; the previous item took the carried item's place
    Swapped { slot: SlotKind, displaced: ItemUid },
    /// Put back where it came from
    Reverted,
    /// Could not go back either and was parked on the controller
    Unbound(ItemUid),
    /// No drag was active
    NoSession,
}

/// Where the item displaced by a swap will go
#[derive(Debug, Clone, Copy, PartialEq)]
enum SwapPlan {
    Grid {
        grid: GridId,
        cell: CellPos,
        rotated: bool,
    },
    Slot(SlotKind),
}

/// The item in flight between pointer-down and pointer-up
#[derive(Debug)]
pub struct DragSession {
    item: ItemInstance,
    origin: DragOrigin,
    hover: PointerTarget,
    preview: Option<PreviewState>,
}

impl DragSession {
    fn new(item: ItemInstance, origin: DragOrigin, hover: PointerTarget) -> Self {
        Self {
            item,
            origin,
            hover,
            preview: None,
        }
    }

    /// The carried item
    pub fn item(&self) -> &ItemInstance {
        &self.item
    }

    pub fn origin(&self) -> DragOrigin {
        self.origin
    }

    /// Whether the carried item is currently rotated
    pub fn rotated(&self) -> bool {
        self.item.rotated
    }

    pub(crate) fn into_parts(self) -> (ItemInstance, DragOrigin) {
        (self.item, self.origin)
    }
}

impl InventoryController {
    /// Start dragging whatever is under the pointer.
    ///
    /// The item leaves its grid or slot immediately. Returns its uid, or
    /// `None` if there was nothing to pick up.
    pub fn on_pointer_down(&mut self, ctx: &mut AppContext, target: PointerTarget) -> Option<ItemUid> {
        if self.drag.is_some() {
            log::warn!("Pointer down while a drag is active, ignoring");
            return None;
        }

        let (item, origin) = match target {
            PointerTarget::Grid { grid, point } => {
                let Some(source) = self.grid_mut(grid) else {
                    log::warn!("Pointer down on missing {}", grid);
                    return None;
                };
                let cell = source.screen_to_cell(point);
                let uid = source.item_at(cell)?;
                let placed = source.remove(uid)?;
                self.events.push(InventoryEvent::GridChanged(grid));

                let origin = DragOrigin::Grid {
                    grid,
                    cell: placed.origin,
                    rotated: placed.item.rotated,
                };
                (placed.item, origin)
            }
            PointerTarget::Slot(kind) => {
                let slot = self.slot_mut(kind)?;
                let child = slot.child_grid().map(InventoryGrid::id);
                let item = slot.unequip(&mut ctx.save_graph)?;

                self.events.push(InventoryEvent::Unequipped {
                    slot: kind,
                    item_id: item.item_id.clone(),
                });
                if let Some(grid) = child {
                    self.events.push(InventoryEvent::GridFlushed { slot: kind, grid });
                }
                self.collect_save_orders(&mut ctx.save_graph);
                (item, DragOrigin::Slot(kind))
            }
            PointerTarget::Outside => return None,
        };

        let uid = item.uid;
        log::debug!("Began drag of {} '{}' from {:?}", uid, item.item_id, origin);
        self.drag = Some(DragSession::new(item, origin, target));
        self.refresh_preview();
        Some(uid)
    }

    /// Update the hover target of the active drag. Nothing is mutated.
    pub fn on_pointer_move(&mut self, target: PointerTarget) {
        let Some(session) = &mut self.drag else {
            return;
        };
        session.hover = target;
        self.refresh_preview();
    }

    /// Rotate the carried item. Returns false when nothing is carried.
    pub fn on_rotate_key(&mut self) -> bool {
        let Some(session) = &mut self.drag else {
            return false;
        };
        session.item.rotate();
        self.refresh_preview();
        true
    }

    /// Resolve the active drag at `target`
    pub fn on_pointer_up(&mut self, ctx: &mut AppContext, target: PointerTarget) -> DropOutcome {
        let Some(session) = self.drag.take() else {
            return DropOutcome::NoSession;
        };
        let (item, origin) = session.into_parts();

        let outcome = match target {
            PointerTarget::Grid { grid, point } => self.drop_on_grid(ctx, item, origin, grid, point),
            PointerTarget::Slot(kind) => self.drop_on_slot(ctx, item, origin, kind),
            PointerTarget::Outside => {
                log::debug!("Dropped outside any grid, returning item");
                self.revert(ctx, item, origin)
            }
        };

        log::debug!("Drop resolved: {:?}", outcome);
        self.collect_save_orders(&mut ctx.save_graph);
        outcome
    }

    /// Preview of the active drag
    pub fn preview_state(&self) -> Option<PreviewState> {
        self.drag.as_ref().and_then(|s| s.preview)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The active drag session
    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    fn drop_on_grid(
        &mut self,
        ctx: &mut AppContext,
        item: ItemInstance,
        origin: DragOrigin,
        grid: GridId,
        point: ScreenPoint,
    ) -> DropOutcome {
        let Some(dest) = self.grid_mut(grid) else {
            log::warn!("Drop on missing {}, returning item", grid);
            return self.revert(ctx, item, origin);
        };
        let cell = dest.screen_to_cell(point);

        // A stack under the pointer takes priority over placement
        if let Some(target_uid) = dest.item_at(cell) {
            let mergeable = dest
                .get(target_uid)
                .map(|p| StackMergeResolver::can_merge(&p.item, &item))
                .unwrap_or(false);
            if !mergeable {
                log::debug!("{} occupied by {}, returning item", cell, target_uid);
                return self.revert(ctx, item, origin);
            }

            let item_id = item.item_id.clone();
            let outcome = match dest.item_mut(target_uid) {
                Some(target) => StackMergeResolver::resolve(target, item),
                None => MergeOutcome::NotMergeable(item),
            };

            return match outcome {
                MergeOutcome::Absorbed { uid, amount } => {
                    self.events.push(InventoryEvent::GridChanged(grid));
                    self.events.push(InventoryEvent::ItemDestroyed { uid, item_id, amount });
                    DropOutcome::Absorbed {
                        target: target_uid,
                        amount,
                    }
                }
                MergeOutcome::Overflow { moved, remainder } => {
                    self.events.push(InventoryEvent::GridChanged(grid));
                    let remainder_uid = remainder.uid;
                    self.revert(ctx, remainder, origin);
                    DropOutcome::Split {
                        target: target_uid,
                        moved,
                        remainder: remainder_uid,
                    }
                }
                MergeOutcome::NotMergeable(item) => self.revert(ctx, item, origin),
            };
        }

        match dest.place(item, cell) {
            Ok(()) => {
                self.events.push(InventoryEvent::GridChanged(grid));
                DropOutcome::Placed { grid, cell }
            }
            Err(rejected) => {
                log::debug!("Drop at {} rejected: {}", cell, rejected.error);
                self.revert(ctx, rejected.item, origin)
            }
        }
    }

    fn drop_on_slot(
        &mut self,
        ctx: &mut AppContext,
        item: ItemInstance,
        origin: DragOrigin,
        kind: SlotKind,
    ) -> DropOutcome {
        let Some(slot) = self.slot(kind) else {
            log::warn!("Drop on missing slot {}, returning item", kind);
            return self.revert(ctx, item, origin);
        };
        if !slot.accepts(&item) {
            log::debug!("{} does not accept {:?}, returning item", kind, item.category);
            return self.revert(ctx, item, origin);
        }

        let plan = match slot.equipped() {
            None => None,
            Some(displaced) => match self.plan_swap(origin, displaced, kind) {
                Some(plan) => Some(plan),
                None => {
                    log::debug!("No room for the item in {}, returning item", kind);
                    return self.revert(ctx, item, origin);
                }
            },
        };

        let Some(slot) = self.slot_mut(kind) else {
            return self.revert(ctx, item, origin);
        };
        let child = slot.child_grid().map(InventoryGrid::id);
        let displaced = if plan.is_some() {
            slot.unequip(&mut ctx.save_graph)
        } else {
            None
        };

        let spawned = match slot.equip(item, &mut ctx.save_graph) {
            Ok(spawned) => spawned,
            Err(rejected) => {
                log::warn!("Equip into {} failed: {}", kind, rejected.error);
                if let Some(displaced) = displaced {
                    self.rebind(ctx, displaced, kind);
                }
                return self.revert(ctx, rejected.item, origin);
            }
        };

        if let Some(displaced) = &displaced {
            self.events.push(InventoryEvent::Unequipped {
                slot: kind,
                item_id: displaced.item_id.clone(),
            });
            if let Some(grid) = child {
                self.events.push(InventoryEvent::GridFlushed { slot: kind, grid });
            }
        }
        self.after_equip(ctx, kind, spawned);

        let (Some(displaced), Some(plan)) = (displaced, plan) else {
            return DropOutcome::Equipped(kind);
        };
        let displaced_uid = displaced.uid;
        match plan {
            SwapPlan::Grid { grid, cell, rotated } => {
                let mut displaced = displaced;
                displaced.set_rotated(rotated);
                match self.grid_mut(grid).map(|g| g.place(displaced, cell)) {
                    Some(Ok(())) => self.events.push(InventoryEvent::GridChanged(grid)),
                    Some(Err(rejected)) => {
                        self.park(rejected.item);
                    }
                    None => log::error!("Swap target {} vanished", grid),
                }
            }
            SwapPlan::Slot(other) => {
                self.rebind(ctx, displaced, other);
            }
        }

        DropOutcome::Swapped {
            slot: kind,
            displaced: displaced_uid,
        }
    }

    /// Find room for the item a swap pushes out of `kind`, without mutating
    fn plan_swap(&self, origin: DragOrigin, displaced: &ItemInstance, kind: SlotKind) -> Option<SwapPlan> {
        match origin {
            DragOrigin::Grid { grid, cell, .. } => {
                // The grid the carried item came from dies with the swap
                if self.container_grid(kind).map(InventoryGrid::id) == Some(grid) {
                    return None;
                }
                let home = self.grid(grid)?;
                let size = displaced.footprint();

                let candidates = [(size, false), (size.rotated(), true)];
                let fits_at_origin = candidates
                    .iter()
                    .find(|(s, _)| home.can_place(cell, *s, None))
                    .map(|&(_, rotated)| SwapPlan::Grid { grid, cell, rotated });

                fits_at_origin.or_else(|| {
                    candidates.iter().find_map(|&(s, rotated)| {
                        home.find_free_position(s)
                            .map(|cell| SwapPlan::Grid { grid, cell, rotated })
                    })
                })
            }
            DragOrigin::Slot(other) => {
                let slot = self.slot(other)?;
                (slot.is_empty() && slot.accepts(displaced)).then_some(SwapPlan::Slot(other))
            }
        }
    }

    /// Put an item back where it was picked up, or park it
    pub(crate) fn revert(
        &mut self,
        ctx: &mut AppContext,
        mut item: ItemInstance,
        origin: DragOrigin,
    ) -> DropOutcome {
        match origin {
            DragOrigin::Grid { grid, cell, rotated } => {
                item.set_rotated(rotated);
                let Some(home) = self.grid_mut(grid) else {
                    log::warn!("Origin {} is gone", grid);
                    return self.park(item);
                };
                match home.place(item, cell) {
                    Ok(()) => {
                        self.events.push(InventoryEvent::GridChanged(grid));
                        DropOutcome::Reverted
                    }
                    Err(rejected) => {
                        log::warn!("Cannot return item to {} at {}: {}", grid, cell, rejected.error);
                        self.park(rejected.item)
                    }
                }
            }
            DragOrigin::Slot(kind) => {
                let uid = item.uid;
                if self.rebind(ctx, item, kind) {
                    DropOutcome::Reverted
                } else {
                    DropOutcome::Unbound(uid)
                }
            }
        }
    }

    /// Equip into `kind`, parking the item if the slot refuses it.
    /// Returns false if the item was parked.
    fn rebind(&mut self, ctx: &mut AppContext, item: ItemInstance, kind: SlotKind) -> bool {
        let Some(slot) = self.slot_mut(kind) else {
            self.park(item);
            return false;
        };
        match slot.equip(item, &mut ctx.save_graph) {
            Ok(spawned) => {
                self.after_equip(ctx, kind, spawned);
                true
            }
            Err(rejected) => {
                log::warn!("Cannot return item to {}: {}", kind, rejected.error);
                self.park(rejected.item);
                false
            }
        }
    }

    fn park(&mut self, item: ItemInstance) -> DropOutcome {
        let uid = item.uid;
        log::warn!("{} '{}' has nowhere to go, keeping it unbound", uid, item.item_id);
        self.events.push(InventoryEvent::ItemUnbound {
            uid,
            item_id: item.item_id.clone(),
        });
        self.record.push(item);
        DropOutcome::Unbound(uid)
    }

    fn after_equip(&mut self, ctx: &mut AppContext, kind: SlotKind, spawned: Option<GridId>) {
        let item_id = self
            .slot(kind)
            .and_then(|s| s.equipped())
            .map(|i| i.item_id.clone())
            .unwrap_or_default();

        if kind.is_weapon() {
            self.events.push(InventoryEvent::WeaponEquipped {
                slot: kind,
                item_id: item_id.clone(),
            });
        }
        self.events.push(InventoryEvent::Equipped { slot: kind, item_id });

        if let Some(grid) = spawned {
            let key = kind.child_save_id();
            if let Err(e) = ctx.save_graph.add_dependency(UI_STATE_ID, key.clone()) {
                log::error!("Failed to order '{}' before UI state: {}", key, e);
            }
            self.panels.bring_to_front(&key);
            self.events.push(InventoryEvent::GridSpawned { slot: kind, grid });
        }
    }

    fn refresh_preview(&mut self) {
        let preview = self.drag.as_ref().and_then(|s| self.compute_preview(s));
        if let Some(session) = &mut self.drag {
            session.preview = preview;
        }
    }

    fn compute_preview(&self, session: &DragSession) -> Option<PreviewState> {
        let footprint = session.item.footprint();

        match session.hover {
            PointerTarget::Grid { grid, point } => {
                let dest = self.grid(grid)?;
                let cell = dest.screen_to_cell(point);
                let (can_place, merge) = match dest.item_at(cell) {
                    Some(uid) => {
                        let merge = dest
                            .get(uid)
                            .map(|p| StackMergeResolver::can_merge(&p.item, &session.item))
                            .unwrap_or(false);
                        (merge, merge)
                    }
                    None => (dest.can_place(cell, footprint, None), false),
                };
                Some(PreviewState {
                    target: PreviewTarget::Cell { grid, cell },
                    footprint,
                    can_place,
                    merge,
                })
            }
            PointerTarget::Slot(kind) => {
                let slot = self.slot(kind)?;
                let can_place = slot.accepts(&session.item)
                    && match slot.equipped() {
                        None => true,
                        Some(displaced) => self.plan_swap(session.origin, displaced, kind).is_some(),
                    };
                Some(PreviewState {
                    target: PreviewTarget::Slot(kind),
                    footprint,
                    can_place,
                    merge: false,
                })
            }
            PointerTarget::Outside => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InventoryConfig;
    use crate::item::{ItemCatalog, ItemCategory, ItemDefinition};

    fn context() -> AppContext {
        let mut config = InventoryConfig::default();
        config.main_grid.width = 4;
        config.main_grid.height = 4;
        AppContext::new(
            config,
            ItemCatalog::from_definitions([
                ItemDefinition::new("ammo", "Ammo")
                    .with_category(ItemCategory::Ammo)
                    .with_max_stack(10),
                ItemDefinition::new("case", "Case").with_size(2, 2),
                ItemDefinition::new("rifle", "Rifle")
                    .with_category(ItemCategory::Weapon)
                    .with_size(3, 1),
            ]),
        )
    }

    fn at(inv: &InventoryController, x: i32, y: i32) -> PointerTarget {
        let grid = inv.main_grid();
        let corner = grid.cell_to_screen(CellPos::new(x, y));
        let half = grid.layout().cell_size / 2.0;
        PointerTarget::Grid {
            grid: grid.id(),
            point: ScreenPoint::new(corner.x + half, corner.y + half),
        }
    }

    #[test]
    fn test_pointer_down_lifts_item() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        inv.add_item(inv.main_grid_id(), "case", 1).unwrap();

        let uid = inv.on_pointer_down(&mut ctx, at(&inv, 1, 1)).unwrap();
        assert!(inv.is_dragging());
        assert_eq!(inv.drag_session().unwrap().item().uid, uid);
        assert_eq!(inv.main_grid().store().occupied_count(), 0);

        // A second press is ignored while dragging
        assert!(inv.on_pointer_down(&mut ctx, at(&inv, 0, 0)).is_none());
    }

    #[test]
    fn test_pointer_down_on_empty_cell() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        assert!(inv.on_pointer_down(&mut ctx, at(&inv, 2, 2)).is_none());
        assert!(inv.on_pointer_down(&mut ctx, PointerTarget::Outside).is_none());
        assert!(!inv.is_dragging());
    }

    #[test]
    fn test_preview_follows_pointer_and_rotation() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        let main = inv.main_grid_id();
        inv.add_item(main, "rifle", 1).unwrap();

        inv.on_pointer_down(&mut ctx, at(&inv, 0, 0)).unwrap();
        inv.on_pointer_move(at(&inv, 1, 2));
        let preview = inv.preview_state().unwrap();
        assert_eq!(preview.target, PreviewTarget::Cell { grid: main, cell: CellPos::new(1, 2) });
        assert!(preview.can_place);
        assert!(!preview.merge);

        inv.on_pointer_move(at(&inv, 2, 2));
        assert!(!inv.preview_state().unwrap().can_place);

        assert!(inv.on_rotate_key());
        let preview = inv.preview_state().unwrap();
        assert_eq!(preview.footprint, Footprint::new(1, 3));
        assert!(!preview.can_place);

        inv.on_pointer_move(at(&inv, 3, 0));
        assert!(inv.preview_state().unwrap().can_place);

        // Preview never mutates the grid
        assert_eq!(inv.main_grid().store().occupied_count(), 0);
    }

    #[test]
    fn test_drop_places_rotated() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        let main = inv.main_grid_id();
        inv.add_item(main, "rifle", 1).unwrap();

        let uid = inv.on_pointer_down(&mut ctx, at(&inv, 0, 0)).unwrap();
        inv.on_rotate_key();
        let outcome = inv.on_pointer_up(&mut ctx, at(&inv, 3, 1));
        assert_eq!(outcome, DropOutcome::Placed { grid: main, cell: CellPos::new(3, 1) });

        let placed = inv.main_grid().get(uid).unwrap();
        assert!(placed.item.rotated);
        assert_eq!(placed.size, Footprint::new(1, 3));
        assert!(!inv.is_dragging());
    }

    #[test]
    fn test_invalid_drop_reverts_with_orientation() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        inv.add_item(inv.main_grid_id(), "rifle", 1).unwrap();

        let uid = inv.on_pointer_down(&mut ctx, at(&inv, 1, 0)).unwrap();
        inv.on_rotate_key();
        // Rotated 1x3 at row 2 leaves the grid
        let outcome = inv.on_pointer_up(&mut ctx, at(&inv, 0, 3));
        assert_eq!(outcome, DropOutcome::Reverted);

        let placed = inv.main_grid().get(uid).unwrap();
        assert_eq!(placed.origin, CellPos::new(0, 0));
        assert!(!placed.item.rotated);
    }

    #[test]
    fn test_drop_outside_reverts() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        inv.add_item(inv.main_grid_id(), "case", 1).unwrap();

        let uid = inv.on_pointer_down(&mut ctx, at(&inv, 0, 0)).unwrap();
        assert_eq!(inv.on_pointer_up(&mut ctx, PointerTarget::Outside), DropOutcome::Reverted);
        assert_eq!(inv.main_grid().get(uid).unwrap().origin, CellPos::new(0, 0));
        assert_eq!(inv.on_pointer_up(&mut ctx, PointerTarget::Outside), DropOutcome::NoSession);
    }

    #[test]
    fn test_drop_on_other_item_reverts() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        let main = inv.main_grid_id();
        inv.add_item(main, "case", 1).unwrap();
        inv.add_item(main, "rifle", 1).unwrap();
        // The rifle does not fit beside the case and lands on row 2
        let rifle = inv.main_grid().item_at(CellPos::new(0, 2)).unwrap();

        inv.on_pointer_down(&mut ctx, at(&inv, 1, 2)).unwrap();
        inv.on_pointer_move(at(&inv, 1, 1));
        let preview = inv.preview_state().unwrap();
        assert!(!preview.can_place && !preview.merge);

        assert_eq!(inv.on_pointer_up(&mut ctx, at(&inv, 1, 1)), DropOutcome::Reverted);
        assert_eq!(inv.main_grid().get(rifle).unwrap().origin, CellPos::new(0, 2));
    }

    #[test]
    fn test_merge_preview_and_absorb() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        let main = inv.main_grid_id();
        inv.add_item(main, "ammo", 10).unwrap();
        inv.add_item(main, "ammo", 10).unwrap();
        let first = inv.main_grid().item_at(CellPos::new(0, 0)).unwrap();
        inv.split_stack(main, first, 6).unwrap();
        inv.drain_events();
        // (0,0): 4, (1,0): 10, (2,0): 6

        let carried = inv.on_pointer_down(&mut ctx, at(&inv, 2, 0)).unwrap();
        inv.on_pointer_move(at(&inv, 0, 0));
        let preview = inv.preview_state().unwrap();
        assert!(preview.merge && preview.can_place);

        inv.on_pointer_move(at(&inv, 1, 0));
        assert!(!inv.preview_state().unwrap().can_place);

        let outcome = inv.on_pointer_up(&mut ctx, at(&inv, 0, 0));
        assert_eq!(outcome, DropOutcome::Absorbed { target: first, amount: 6 });
        assert_eq!(inv.main_grid().get(first).unwrap().item.current_stack, 10);
        assert!(inv.main_grid().get(carried).is_none());
        assert_eq!(inv.total_count("ammo"), 20);

        let events = inv.drain_events();
        assert!(events.contains(&InventoryEvent::ItemDestroyed {
            uid: carried,
            item_id: "ammo".to_string(),
            amount: 6,
        }));
    }

    #[test]
    fn test_blocked_origin_parks_item() {
        let mut ctx = context();
        let mut inv = InventoryController::new(&mut ctx).unwrap();
        let main = inv.main_grid_id();
        inv.add_item(main, "case", 1).unwrap();

        let uid = inv.on_pointer_down(&mut ctx, at(&inv, 0, 0)).unwrap();
        // Something else takes the origin while the case is in flight
        inv.add_item(main, "case", 1).unwrap();

        let outcome = inv.on_pointer_up(&mut ctx, PointerTarget::Outside);
        assert_eq!(outcome, DropOutcome::Unbound(uid));
        assert_eq!(inv.unbound_items().len(), 1);
        assert_eq!(inv.total_count("case"), 2);

        assert_eq!(inv.reclaim_unbound(main), 1);
        assert!(inv.unbound_items().is_empty());
        assert_eq!(inv.main_grid().item_count(), 2);
    }
}
