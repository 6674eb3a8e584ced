//! Integration tests for ordered save passes
//!
//! Builds an inventory-shaped graph, grows and shrinks it the way container
//! grids come and go, and checks that what reaches disk follows the order.

use serde::{Deserialize, Serialize};
use void_gamestate::prelude::*;

const NONE: [&str; 0] = [];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cells {
    filled: Vec<u32>,
}

struct Entity {
    id: String,
    cells: Cells,
}

impl Entity {
    fn new(id: &str, filled: &[u32]) -> Self {
        Self {
            id: id.to_string(),
            cells: Cells {
                filled: filled.to_vec(),
            },
        }
    }
}

impl Persistable for Entity {
    fn save_id(&self) -> &str {
        &self.id
    }

    fn serialize(&self) -> Result<String, SaveError> {
        to_payload(&self.cells)
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        self.cells = from_payload(payload)?;
        Ok(())
    }

    fn is_modified(&self) -> bool {
        true
    }

    fn validate(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct World {
    entities: Vec<Entity>,
    restored: Vec<String>,
}

impl World {
    fn find(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }
}

impl SaveSource for World {
    fn persistable(&self, id: &str) -> Option<&dyn Persistable> {
        self.find(id).map(|e| e as &dyn Persistable)
    }
}

impl RestoreTarget for World {
    fn persistable_mut(&mut self, id: &str) -> Option<&mut dyn Persistable> {
        self.entities
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| e as &mut dyn Persistable)
    }

    fn restored(&mut self, id: &str) {
        self.restored.push(id.to_string());
    }
}

/// Nodes registered in the order an inventory registers them
fn inventory_graph() -> SaveDependencyGraph {
    let mut graph = SaveDependencyGraph::new();
    graph.register("items.catalog", SavePriority::ItemData, NONE).unwrap();
    graph.register("grids.layout", SavePriority::GridLayout, NONE).unwrap();
    graph.register("slot.backpack", SavePriority::EquipmentSlot, ["items.catalog"]).unwrap();
    graph
        .register("grid.main", SavePriority::GridContents, ["grids.layout", "items.catalog"])
        .unwrap();
    graph.register("inventory.controller", SavePriority::Controller, ["grid.main"]).unwrap();
    graph.register("ui.state", SavePriority::UiState, ["inventory.controller"]).unwrap();
    graph.register("ui.containers", SavePriority::ContainerUi, ["ui.state"]).unwrap();
    graph
}

fn position(order: &[String], id: &str) -> usize {
    order.iter().position(|o| o == id).unwrap_or_else(|| panic!("{} missing", id))
}

#[test]
fn test_inventory_graph_order() {
    let graph = inventory_graph();
    assert_eq!(
        graph.save_order(),
        [
            "items.catalog",
            "grids.layout",
            "slot.backpack",
            "grid.main",
            "inventory.controller",
            "ui.state",
            "ui.containers",
        ]
    );
}

#[test]
fn test_container_grid_lifecycle() {
    let mut graph = inventory_graph();
    graph.drain_computed_orders();

    graph.register("grid.backpack", SavePriority::GridContents, ["slot.backpack"]).unwrap();
    graph.add_dependency("ui.state", "grid.backpack").unwrap();

    let order = graph.save_order().to_vec();
    assert!(position(&order, "slot.backpack") < position(&order, "grid.backpack"));
    assert!(position(&order, "grid.backpack") < position(&order, "ui.state"));
    // Same band as the main grid but registered later
    assert!(position(&order, "grid.main") < position(&order, "grid.backpack"));
    assert_eq!(graph.drain_computed_orders().len(), 2);

    graph.unregister("grid.backpack");
    assert!(graph.get("ui.state").map(|n| !n.depends_on("grid.backpack")).unwrap_or(false));
    assert_eq!(graph.save_order(), inventory_graph().save_order());
    assert!(graph.dependents_of("slot.backpack").is_empty());
}

#[test]
fn test_cyclic_edge_is_rejected() {
    let mut graph = inventory_graph();
    let before = graph.save_order().to_vec();

    let err = graph.add_dependency("grid.main", "ui.containers").unwrap_err();
    match err {
        DependencyError::CycleDetected(path) => {
            assert_eq!(path.first(), path.last());
            assert!(path.len() > 2);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(graph.is_consistent());
    assert!(graph.last_error().is_some());
    assert_eq!(graph.save_order(), before.as_slice());
    assert!(!graph.get("grid.main").unwrap().depends_on("ui.containers"));

    // The graph keeps accepting valid changes
    graph.add_dependency("ui.containers", "items.catalog").unwrap();
    assert!(graph.last_error().is_none());
}

#[test]
fn test_binary_quicksave_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut saves = SaveManager::new(dir.path()).with_format(SaveFormat::Binary);
    let graph = inventory_graph();

    let ids = [
        "items.catalog",
        "grids.layout",
        "slot.backpack",
        "grid.main",
        "inventory.controller",
        "ui.state",
    ];
    let mut world = World::default();
    for (i, id) in ids.iter().enumerate() {
        world.entities.push(Entity::new(id, &[i as u32, 7]));
    }

    let report = saves.quicksave(&graph, &world).unwrap();
    assert_eq!(report.order.len(), ids.len());
    assert_eq!(report.skipped, vec!["ui.containers".to_string()]);
    assert!(saves.exists("quicksave"));

    for entity in &mut world.entities {
        entity.cells.filled.clear();
    }

    let data = saves.quickload().unwrap();
    let entry_ids: Vec<&str> = data.ids().collect();
    assert_eq!(entry_ids, ids);

    let restored = SaveManager::restore(&data, &mut world);
    assert!(restored.is_complete());
    assert_eq!(world.restored, ids);
    assert_eq!(world.find("grid.main").unwrap().cells.filled, vec![3, 7]);
}
