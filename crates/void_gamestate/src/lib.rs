//! Void GameState - Save Ordering and Persistence
//!
//! This crate decides in which order persistable entities are written and
//! handles the save/load passes themselves.
//!
//! # Features
//!
//! - Save-dependency graph with priority bands and cycle detection
//! - Persistable-entity contract
//! - Ordered save passes to JSON or binary slot files
//! - Best-effort restore in saved order
//! - Autosave rotation and quicksave
//!
//! # Example
//!
//! ```ignore
//! use void_gamestate::prelude::*;
//!
//! let mut graph = SaveDependencyGraph::new();
//! graph.register("slot.backpack", SavePriority::EquipmentSlot, Vec::<String>::new())?;
//! graph.register("grid.backpack", SavePriority::GridContents, ["slot.backpack"])?;
//!
//! let mut saves = SaveManager::new("saves").with_format(SaveFormat::Json);
//! saves.save_pass("slot1", &graph, &world)?;
//! ```

pub mod config;
pub mod dependency;
pub mod persist;
pub mod save;

pub mod prelude {
    pub use crate::config::SaveConfig;
    pub use crate::dependency::{DependencyError, SaveDependencyGraph, SavePriority, SaveableNode};
    pub use crate::persist::{from_payload, to_payload, Persistable, RestoreTarget, SaveSource};
    pub use crate::save::{
        RestoreReport, SaveData, SaveEntry, SaveError, SaveFormat, SaveHeader, SaveManager,
        SaveReport, SaveSlot, SAVE_VERSION,
    };
}

pub use prelude::*;
