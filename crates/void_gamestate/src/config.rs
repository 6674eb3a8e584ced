//! Save configuration

use crate::save::SaveFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how saves are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Directory holding the slot files
    pub dir: PathBuf,
    /// File format
    pub format: SaveFormat,
    /// Number of rotating autosave slots
    pub max_autosaves: usize,
    /// Slot used by the default save/load commands
    pub default_slot: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("saves"),
            format: SaveFormat::Json,
            max_autosaves: 3,
            default_slot: "quicksave".to_string(),
        }
    }
}
