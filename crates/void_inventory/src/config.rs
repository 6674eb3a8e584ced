//! Inventory configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `VOID_INVENTORY_SAVE_DIR`, `VOID_INVENTORY_SAVE_FORMAT`
//! 2. Config file named by `VOID_INVENTORY_CONFIG`, else `inventory.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! cell_size = 48.0
//!
//! [main_grid]
//! width = 10
//! height = 12
//! origin = [40.0, 80.0]
//!
//! [container_origins]
//! backpack = [600.0, 80.0]
//! tactical_rig = [600.0, 400.0]
//!
//! [save]
//! dir = "saves"
//! format = "json"
//!
//! [[items]]
//! id = "ammo_545"
//! name = "5.45x39 BP"
//! category = "ammo"
//! max_stack = 60
//! ```

use crate::equipment::SlotKind;
use crate::item::ItemDefinition;
use crate::placement::{GridLayout, ScreenPoint};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use void_gamestate::SaveConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main grid size and position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainGridConfig {
    pub width: u32,
    pub height: u32,
    pub origin: [f32; 2],
}

impl Default for MainGridConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 12,
            origin: [0.0, 0.0],
        }
    }
}

/// Screen origin of the grid each container slot spawns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOrigins {
    pub backpack: [f32; 2],
    pub tactical_rig: [f32; 2],
}

impl Default for ContainerOrigins {
    fn default() -> Self {
        Self {
            backpack: [600.0, 0.0],
            tactical_rig: [600.0, 300.0],
        }
    }
}

impl ContainerOrigins {
    pub fn get(&self, slot: SlotKind) -> Option<[f32; 2]> {
        match slot {
            SlotKind::Backpack => Some(self.backpack),
            SlotKind::TacticalRig => Some(self.tactical_rig),
            _ => None,
        }
    }
}

/// Complete inventory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Side of one cell in pixels, shared by every grid
    pub cell_size: f32,
    pub main_grid: MainGridConfig,
    pub container_origins: ContainerOrigins,
    /// Slots the player has
    pub slots: Vec<SlotKind>,
    pub save: SaveConfig,
    /// Item definitions
    pub items: Vec<ItemDefinition>,
    /// Path the configuration was read from
    #[serde(skip)]
    pub config_path: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            cell_size: 50.0,
            main_grid: MainGridConfig::default(),
            container_origins: ContainerOrigins::default(),
            slots: SlotKind::all().to_vec(),
            save: SaveConfig::default(),
            items: Vec::new(),
            config_path: None,
        }
    }
}

impl InventoryConfig {
    /// Load configuration from all sources
    pub fn load() -> Self {
        let path = std::env::var("VOID_INVENTORY_CONFIG").unwrap_or_else(|_| "inventory.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            match Self::from_file(&path) {
                Ok(mut loaded) => {
                    log::info!("Loaded inventory config from {}", path);
                    loaded.config_path = Some(path);
                    loaded
                }
                Err(e) => {
                    log::warn!("Ignoring inventory config {}: {}", path, e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_env();
        config
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("VOID_INVENTORY_SAVE_DIR") {
            if !dir.is_empty() {
                self.save.dir = dir.into();
                log::info!("Save dir from env: {}", self.save.dir.display());
            }
        }

        if let Ok(format) = std::env::var("VOID_INVENTORY_SAVE_FORMAT") {
            match format.parse() {
                Ok(f) => self.save.format = f,
                Err(e) => log::warn!("{}", e),
            }
        }
    }

    /// Screen layout of the main grid
    pub fn main_layout(&self) -> GridLayout {
        self.layout_at(self.main_grid.origin)
    }

    /// Screen layout of the grid spawned in `slot`
    pub fn container_layout(&self, slot: SlotKind) -> GridLayout {
        self.layout_at(self.container_origins.get(slot).unwrap_or_default())
    }

    fn layout_at(&self, origin: [f32; 2]) -> GridLayout {
        GridLayout {
            origin: ScreenPoint::new(origin[0], origin[1]),
            cell_size: self.cell_size,
        }
    }
}
