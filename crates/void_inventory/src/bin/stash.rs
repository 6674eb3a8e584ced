//! Stash demo
//!
//! Drives an inventory through a scripted session: fill the main grid, drag
//! a backpack into its slot, move ammo into the backpack, then save and load
//! the whole thing back.
//!
//! Run with: cargo run -p void_inventory --bin stash

use std::process::ExitCode;

use void_inventory::prelude::*;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = InventoryConfig::load();
    if config.items.is_empty() {
        log::info!("No items configured, using the demo catalog");
        config.items = demo_items();
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Stash demo failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn demo_items() -> Vec<ItemDefinition> {
    vec![
        ItemDefinition::new("ammo_545", "5.45x39 BP")
            .with_category(ItemCategory::Ammo)
            .with_max_stack(60),
        ItemDefinition::new("ak74", "AK-74")
            .with_category(ItemCategory::Weapon)
            .with_size(4, 2),
        ItemDefinition::new("pilgrim", "Pilgrim")
            .with_category(ItemCategory::Backpack)
            .with_size(3, 3)
            .with_capacity(5, 5),
        ItemDefinition::new("salewa", "Salewa")
            .with_category(ItemCategory::Medical)
            .with_size(1, 2),
    ]
}

fn run(config: InventoryConfig) -> Result<(), InventoryError> {
    let slot_name = config.save.default_slot.clone();
    let mut ctx = AppContext::from_config(config);
    let mut inventory = InventoryController::new(&mut ctx)?;
    let main = inventory.main_grid_id();

    inventory.add_item(main, "ak74", 1)?;
    inventory.add_item(main, "pilgrim", 1)?;
    inventory.add_item(main, "salewa", 2)?;
    let overflow = inventory.add_item(main, "ammo_545", 150)?;
    if overflow > 0 {
        log::warn!("{} rounds did not fit", overflow);
    }
    print_grid(inventory.main_grid());

    // Drag the backpack into its slot
    if let Some(cell) = find_cell(inventory.main_grid(), "pilgrim") {
        let point = center_of(inventory.main_grid(), cell);
        drag(&mut ctx, &mut inventory, grid_target(main, point), PointerTarget::Slot(SlotKind::Backpack));
    }

    // Then a stack of ammo into the backpack's grid
    let backpack = inventory.container_grid(SlotKind::Backpack).map(|g| (g.id(), g.cell_to_screen(CellPos::new(0, 0))));
    if let (Some((grid, corner)), Some(cell)) = (backpack, find_cell(inventory.main_grid(), "ammo_545")) {
        let from = center_of(inventory.main_grid(), cell);
        drag(&mut ctx, &mut inventory, grid_target(main, from), grid_target(grid, corner));
    }

    for event in inventory.drain_events() {
        log::debug!("{:?}", event);
    }

    let report = inventory.save(&mut ctx, &slot_name)?;
    println!("Saved slot '{}' in order:", report.slot);
    for id in &report.order {
        println!("  {}", id);
    }

    let ammo_before = inventory.total_count("ammo_545");
    let restored = inventory.load(&mut ctx, &slot_name)?;
    println!(
        "Restored {} entities, ammo {} -> {}",
        restored.restored.len(),
        ammo_before,
        inventory.total_count("ammo_545")
    );
    print_grid(inventory.main_grid());
    if let Some(grid) = inventory.container_grid(SlotKind::Backpack) {
        print_grid(grid);
    }

    inventory.shutdown(&mut ctx);
    Ok(())
}

fn drag(ctx: &mut AppContext, inventory: &mut InventoryController, from: PointerTarget, to: PointerTarget) {
    let press = InputState {
        target: from,
        pressed: true,
        ..Default::default()
    };
    inventory.tick(ctx, &press);

    let hover = InputState {
        target: to,
        ..Default::default()
    };
    inventory.tick(ctx, &hover);
    if let Some(preview) = inventory.preview_state() {
        log::info!("Preview over {:?}: can place = {}", preview.target, preview.can_place);
    }

    let release = InputState {
        target: to,
        released: true,
        ..Default::default()
    };
    if let Some(outcome) = inventory.tick(ctx, &release) {
        log::info!("Drop: {:?}", outcome);
    }
}

fn grid_target(grid: GridId, point: ScreenPoint) -> PointerTarget {
    PointerTarget::Grid { grid, point }
}

fn find_cell(grid: &InventoryGrid, item_id: &str) -> Option<CellPos> {
    grid.items().find(|p| p.item.item_id == item_id).map(|p| p.origin)
}

fn center_of(grid: &InventoryGrid, cell: CellPos) -> ScreenPoint {
    let corner = grid.cell_to_screen(cell);
    let half = grid.layout().cell_size / 2.0;
    ScreenPoint::new(corner.x + half, corner.y + half)
}

fn print_grid(grid: &InventoryGrid) {
    let store = grid.store();
    println!(
        "{} ({}x{}, {:.0}% full)",
        grid.key(),
        store.width(),
        store.height(),
        store.occupancy_rate() * 100.0
    );
    for y in 0..store.height() {
        let row: String = store
            .row(y)
            .iter()
            .map(|&occupied| if occupied { '#' } else { '.' })
            .collect();
        println!("  {}", row);
    }
}
