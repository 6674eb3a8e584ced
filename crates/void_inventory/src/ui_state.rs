//! UI-facing state that survives saves
//!
//! Nothing here renders; it only tracks what a renderer would need to
//! restore the panels as the player left them.

use crate::grid::GridId;
use crate::persist::{CONTAINER_UI_ID, UI_STATE_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use void_gamestate::{from_payload, to_payload, Persistable, SaveError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSnapshot {
    open: bool,
    focused_grid: Option<String>,
}

/// Whether the inventory is open and which grid has focus
#[derive(Debug, Clone, Default)]
pub struct UiState {
    open: bool,
    /// Save id of the focused grid
    focused: Option<String>,
    /// Grid under the pointer this frame
    hovered: Option<GridId>,
    modified: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        if self.open != open {
            self.open = open;
            self.modified = true;
        }
    }

    /// Save id of the focused grid
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Focus a grid by save id. Returns true if focus moved.
    pub fn focus(&mut self, save_id: Option<&str>) -> bool {
        if self.focused.as_deref() == save_id {
            return false;
        }
        self.focused = save_id.map(str::to_string);
        self.modified = true;
        true
    }

    pub fn hovered(&self) -> Option<GridId> {
        self.hovered
    }

    /// Track the hovered grid. Returns true if it changed.
    pub fn hover(&mut self, grid: Option<GridId>) -> bool {
        let changed = self.hovered != grid;
        self.hovered = grid;
        changed
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}

impl Persistable for UiState {
    fn save_id(&self) -> &str {
        UI_STATE_ID
    }

    fn serialize(&self) -> Result<String, SaveError> {
        to_payload(&UiSnapshot {
            open: self.open,
            focused_grid: self.focused.clone(),
        })
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        let snapshot: UiSnapshot = from_payload(payload)?;
        self.open = snapshot.open;
        self.focused = snapshot.focused_grid;
        self.hovered = None;
        self.modified = false;
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn validate(&self) -> bool {
        true
    }
}

/// Cosmetic state of one container panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub collapsed: bool,
    pub z_order: u32,
}

/// Panel state of every container grid, keyed by grid save id
#[derive(Debug, Clone, Default)]
pub struct ContainerUiState {
    panels: BTreeMap<String, PanelState>,
    modified: bool,
}

impl ContainerUiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panel(&self, save_id: &str) -> Option<PanelState> {
        self.panels.get(save_id).copied()
    }

    /// Put a panel on top of the others, creating it if needed
    pub fn bring_to_front(&mut self, save_id: &str) {
        let top = self.panels.values().map(|p| p.z_order).max().unwrap_or(0);
        let panel = self.panels.entry(save_id.to_string()).or_default();
        if panel.z_order != top || top == 0 {
            panel.z_order = top + 1;
            self.modified = true;
        }
    }

    /// Flip the collapsed flag. Returns the new value.
    pub fn toggle_collapsed(&mut self, save_id: &str) -> bool {
        let panel = self.panels.entry(save_id.to_string()).or_default();
        panel.collapsed = !panel.collapsed;
        self.modified = true;
        panel.collapsed
    }

    pub fn is_collapsed(&self, save_id: &str) -> bool {
        self.panels.get(save_id).map(|p| p.collapsed).unwrap_or(false)
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}

impl Persistable for ContainerUiState {
    fn save_id(&self) -> &str {
        CONTAINER_UI_ID
    }

    fn serialize(&self) -> Result<String, SaveError> {
        to_payload(&self.panels)
    }

    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError> {
        self.panels = from_payload(payload)?;
        self.modified = false;
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn validate(&self) -> bool {
        true
    }
}
