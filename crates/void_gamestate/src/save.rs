//! Save/load system
//!
//! A save pass walks the save graph's current order, serializes every
//! registered entity in that order and writes the result to a slot file.
//! Restoring replays the stored entries in the order they were written.

use crate::config::SaveConfig;
use crate::dependency::SaveDependencyGraph;
use crate::persist::{RestoreTarget, SaveSource};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Current save file version
pub const SAVE_VERSION: u32 = 1;

/// Save system errors
#[derive(Debug, Error)]
pub enum SaveError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// Version mismatch
    #[error("Version mismatch: save version {0}, current version {1}")]
    VersionMismatch(u32, u32),
    /// Slot not found
    #[error("Save slot not found: {0}")]
    SlotNotFound(String),
    /// The save graph has no valid order right now
    #[error("Save order unavailable: {0}")]
    OrderUnavailable(String),
    /// The save order failed validation
    #[error("Save order failed validation")]
    InvalidOrder,
    /// Corrupted save
    #[error("Corrupted save data: {0}")]
    Corrupted(String),
}

/// Save file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// JSON (human readable)
    Json,
    /// Binary (compact)
    Binary,
}

impl Default for SaveFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl SaveFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "sav",
        }
    }
}

impl std::str::FromStr for SaveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "binary" | "bin" | "sav" => Ok(Self::Binary),
            _ => Err(format!("Unknown save format: {}", s)),
        }
    }
}

/// Save data header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveHeader {
    /// Save format version
    pub version: u32,
    /// Game version
    pub game_version: String,
    /// Save name/title
    pub name: String,
    /// Save timestamp (Unix timestamp)
    pub timestamp: u64,
}

impl SaveHeader {
    /// Create a new header
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SAVE_VERSION,
            game_version: String::new(),
            name: name.into(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// One serialized entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEntry {
    /// Entity id
    pub id: String,
    /// Priority the entity was registered with
    pub priority: i32,
    /// JSON payload produced by `Persistable::serialize`
    pub payload: String,
}

/// Complete save data, entries in save order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    /// Save header
    pub header: SaveHeader,
    /// Serialized entities in dependency order
    pub entries: Vec<SaveEntry>,
}

impl SaveData {
    /// Create new, empty save data
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: SaveHeader::new(name),
            entries: Vec::new(),
        }
    }

    /// Append an entry
    pub fn push(&mut self, id: impl Into<String>, priority: i32, payload: impl Into<String>) {
        self.entries.push(SaveEntry {
            id: id.into(),
            priority,
            payload: payload.into(),
        });
    }

    /// Find an entry by id
    pub fn entry(&self, id: &str) -> Option<&SaveEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entry ids in stored order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject duplicate entry ids
    fn check_integrity(&self) -> Result<(), SaveError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(SaveError::Corrupted(format!("duplicate entry '{}'", entry.id)));
            }
        }
        Ok(())
    }
}

/// Outcome of a save pass
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Slot written
    pub slot: String,
    /// Order the entities were written in
    pub order: Vec<String>,
    /// Number of entities that were modified since their last save
    pub modified: usize,
    /// Registered ids that were skipped (missing or invalid)
    pub skipped: Vec<String>,
}

/// Outcome of a restore pass
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// Ids restored successfully, in order
    pub restored: Vec<String>,
    /// Ids whose payload was rejected, with the reason
    pub failed: Vec<(String, String)>,
    /// Ids present in the save with no live entity to receive them
    pub missing: Vec<String>,
}

impl RestoreReport {
    /// Whether every entry was restored
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.missing.is_empty()
    }
}

/// Save slot info (for displaying in UI)
#[derive(Debug, Clone)]
pub struct SaveSlot {
    /// Slot identifier
    pub id: String,
    /// Save header (or None if empty)
    pub header: Option<SaveHeader>,
    /// File path
    pub path: PathBuf,
    /// Whether slot is occupied
    pub occupied: bool,
}

impl SaveSlot {
    /// Create an empty slot
    pub fn empty(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            header: None,
            path: path.into(),
            occupied: false,
        }
    }

    /// Create an occupied slot
    pub fn occupied(id: impl Into<String>, path: impl Into<PathBuf>, header: SaveHeader) -> Self {
        Self {
            id: id.into(),
            header: Some(header),
            path: path.into(),
            occupied: true,
        }
    }
}

/// Save manager
pub struct SaveManager {
    /// Base save directory
    save_dir: PathBuf,
    /// Save file format
    format: SaveFormat,
    /// Current save version
    version: u32,
    /// Cached slot info
    slots: HashMap<String, SaveSlot>,
    /// Maximum number of auto-saves
    max_autosaves: usize,
}

impl SaveManager {
    /// Create a new save manager
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            format: SaveFormat::default(),
            version: SAVE_VERSION,
            slots: HashMap::new(),
            max_autosaves: 3,
        }
    }

    /// Create a save manager from configuration
    pub fn from_config(config: &SaveConfig) -> Self {
        Self::new(&config.dir)
            .with_format(config.format)
            .with_max_autosaves(config.max_autosaves)
    }

    /// Set save format
    pub fn with_format(mut self, format: SaveFormat) -> Self {
        self.format = format;
        self
    }

    /// Set version
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set max autosaves
    pub fn with_max_autosaves(mut self, max: usize) -> Self {
        self.max_autosaves = max.max(1);
        self
    }

    /// Save directory
    pub fn save_dir(&self) -> &PathBuf {
        &self.save_dir
    }

    /// Ensure save directory exists
    pub fn ensure_dir(&self) -> Result<(), SaveError> {
        fs::create_dir_all(&self.save_dir)?;
        Ok(())
    }

    /// Get save file path for a slot
    fn slot_path(&self, slot: &str) -> PathBuf {
        self.save_dir.join(format!("{}.{}", slot, self.format.extension()))
    }

    /// Serialize every registered entity in save order.
    ///
    /// Fails without collecting anything if the graph has no valid order;
    /// a broken order blocks the pass, it is never repaired here.
    pub fn collect(
        name: &str,
        graph: &SaveDependencyGraph,
        source: &dyn SaveSource,
    ) -> Result<(SaveData, SaveReport), SaveError> {
        if !graph.is_consistent() {
            let reason = graph
                .last_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "save graph inconsistent".to_string());
            return Err(SaveError::OrderUnavailable(reason));
        }

        let order = graph.save_order().to_vec();
        if !graph.validate_order(&order) {
            return Err(SaveError::InvalidOrder);
        }

        let mut data = SaveData::new(name);
        let mut report = SaveReport::default();

        for id in &order {
            let Some(entity) = source.persistable(id) else {
                log::warn!("Save node '{}' has no live entity, skipping", id);
                report.skipped.push(id.clone());
                continue;
            };

            if !entity.validate() {
                log::warn!("Entity '{}' failed validation, skipping", id);
                report.skipped.push(id.clone());
                continue;
            }

            if entity.is_modified() {
                report.modified += 1;
            }

            let priority = graph.get(id).map(|n| n.priority).unwrap_or_default();
            data.push(id.clone(), priority, entity.serialize()?);
            report.order.push(id.clone());
        }

        Ok((data, report))
    }

    /// Run a full save pass into `slot`
    pub fn save_pass(
        &mut self,
        slot: &str,
        graph: &SaveDependencyGraph,
        source: &dyn SaveSource,
    ) -> Result<SaveReport, SaveError> {
        let (data, mut report) = Self::collect(slot, graph, source)?;
        self.save(slot, &data)?;
        report.slot = slot.to_string();

        log::info!(
            "Saved {} entities to slot '{}' ({} modified, {} skipped)",
            report.order.len(),
            slot,
            report.modified,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Replay saved entries into live entities, in stored order.
    ///
    /// Best effort: a rejected payload is logged and the pass continues.
    pub fn restore(data: &SaveData, target: &mut dyn RestoreTarget) -> RestoreReport {
        let mut report = RestoreReport::default();

        for entry in &data.entries {
            let Some(entity) = target.persistable_mut(&entry.id) else {
                log::warn!("No live entity for saved entry '{}'", entry.id);
                report.missing.push(entry.id.clone());
                continue;
            };

            match entity.deserialize(&entry.payload) {
                Ok(()) => {
                    target.restored(&entry.id);
                    report.restored.push(entry.id.clone());
                }
                Err(e) => {
                    log::warn!("Failed to restore '{}': {}", entry.id, e);
                    report.failed.push((entry.id.clone(), e.to_string()));
                }
            }
        }

        report
    }

    /// Save game to slot
    pub fn save(&mut self, slot: &str, data: &SaveData) -> Result<(), SaveError> {
        self.ensure_dir()?;

        let path = self.slot_path(slot);

        let bytes = match self.format {
            SaveFormat::Json => serde_json::to_vec_pretty(data)
                .map_err(|e| SaveError::Serialization(e.to_string()))?,
            SaveFormat::Binary => bincode::serialize(data)
                .map_err(|e| SaveError::Serialization(e.to_string()))?,
        };

        fs::write(&path, bytes)?;

        self.slots.insert(
            slot.to_string(),
            SaveSlot::occupied(slot, path, data.header.clone()),
        );

        Ok(())
    }

    /// Load game from slot
    pub fn load(&self, slot: &str) -> Result<SaveData, SaveError> {
        let path = self.slot_path(slot);

        if !path.exists() {
            return Err(SaveError::SlotNotFound(slot.to_string()));
        }

        let bytes = fs::read(&path)?;

        let data: SaveData = match self.format {
            SaveFormat::Json => serde_json::from_slice(&bytes)
                .map_err(|e| SaveError::Deserialization(e.to_string()))?,
            SaveFormat::Binary => bincode::deserialize(&bytes)
                .map_err(|e| SaveError::Deserialization(e.to_string()))?,
        };

        if data.header.version > self.version {
            return Err(SaveError::VersionMismatch(data.header.version, self.version));
        }
        data.check_integrity()?;

        Ok(data)
    }

    /// Delete a save slot
    pub fn delete(&mut self, slot: &str) -> Result<(), SaveError> {
        let path = self.slot_path(slot);

        if path.exists() {
            fs::remove_file(&path)?;
        }

        self.slots.remove(slot);
        Ok(())
    }

    /// Check if slot exists
    pub fn exists(&self, slot: &str) -> bool {
        self.slot_path(slot).exists()
    }

    /// Get slot info
    pub fn get_slot(&mut self, slot: &str) -> Result<SaveSlot, SaveError> {
        if let Some(cached) = self.slots.get(slot) {
            return Ok(cached.clone());
        }

        let path = self.slot_path(slot);

        if !path.exists() {
            return Ok(SaveSlot::empty(slot, path));
        }

        let data = self.load(slot)?;
        let slot_info = SaveSlot::occupied(slot, path, data.header);
        self.slots.insert(slot.to_string(), slot_info.clone());

        Ok(slot_info)
    }

    /// List all save slots, newest first
    pub fn list_slots(&mut self) -> Result<Vec<SaveSlot>, SaveError> {
        self.ensure_dir()?;

        let mut slots = Vec::new();
        let ext = self.format.extension();

        for entry in fs::read_dir(&self.save_dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == ext).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    match self.get_slot(stem) {
                        Ok(slot) => slots.push(slot),
                        Err(e) => log::warn!("Unreadable save slot '{}': {}", stem, e),
                    }
                }
            }
        }

        slots.sort_by(|a, b| {
            let ts_a = a.header.as_ref().map(|h| h.timestamp).unwrap_or(0);
            let ts_b = b.header.as_ref().map(|h| h.timestamp).unwrap_or(0);
            ts_b.cmp(&ts_a)
        });

        Ok(slots)
    }

    /// Auto-save pass with slot rotation, returns the slot written
    pub fn autosave(
        &mut self,
        graph: &SaveDependencyGraph,
        source: &dyn SaveSource,
    ) -> Result<SaveReport, SaveError> {
        let mut autosaves: Vec<String> = (0..self.max_autosaves)
            .map(|i| format!("autosave_{}", i))
            .collect();

        // Oldest (or never written) first
        autosaves.sort_by_key(|slot| {
            self.slots
                .get(slot)
                .and_then(|s| s.header.as_ref())
                .map(|h| h.timestamp)
                .unwrap_or(0)
        });

        let slot = autosaves
            .first()
            .cloned()
            .unwrap_or_else(|| "autosave_0".to_string());
        self.save_pass(&slot, graph, source)
    }

    /// Quick save
    pub fn quicksave(
        &mut self,
        graph: &SaveDependencyGraph,
        source: &dyn SaveSource,
    ) -> Result<SaveReport, SaveError> {
        self.save_pass("quicksave", graph, source)
    }

    /// Quick load
    pub fn quickload(&self) -> Result<SaveData, SaveError> {
        self.load("quicksave")
    }
}
