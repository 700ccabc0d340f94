//! Layer switcher panel.
//!
//! Base layers behave like radio buttons: exactly one of them is visible at
//! a time and the first entry is selected at startup. Overlay layers are
//! independent checkboxes that all start enabled.

use crate::core::map::MapView;

/// One switchable layer and the label shown next to it.
#[derive(Debug, Clone)]
pub struct LayerEntry {
    pub layer_id: String,
    pub label: String,
}

impl LayerEntry {
    pub fn new(layer_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            layer_id: layer_id.into(),
            label: label.into(),
        }
    }
}

/// Tracks which base layer is selected and which overlays are enabled, and
/// pushes that state into the map's layer visibility.
pub struct LayerControl {
    base: Vec<LayerEntry>,
    overlays: Vec<LayerEntry>,
    selected_base: Option<usize>,
    overlay_enabled: Vec<bool>,
}

impl LayerControl {
    pub fn new(base: Vec<LayerEntry>, overlays: Vec<LayerEntry>) -> Self {
        let selected_base = if base.is_empty() { None } else { Some(0) };
        let overlay_enabled = vec![true; overlays.len()];
        Self {
            base,
            overlays,
            selected_base,
            overlay_enabled,
        }
    }

    pub fn base_entries(&self) -> &[LayerEntry] {
        &self.base
    }

    pub fn overlay_entries(&self) -> &[LayerEntry] {
        &self.overlays
    }

    /// Layer id of the currently selected base entry.
    pub fn selected_base(&self) -> Option<&str> {
        self.selected_base
            .and_then(|index| self.base.get(index))
            .map(|entry| entry.layer_id.as_str())
    }

    pub fn select_base(&mut self, index: usize) {
        if index < self.base.len() {
            self.selected_base = Some(index);
        }
    }

    pub fn overlay_enabled(&self, index: usize) -> bool {
        self.overlay_enabled.get(index).copied().unwrap_or(false)
    }

    pub fn set_overlay_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(flag) = self.overlay_enabled.get_mut(index) {
            *flag = enabled;
        }
    }

    /// Applies the control state to the map: the selected base layer becomes
    /// visible, the other base layers are hidden and every overlay follows
    /// its checkbox.
    pub fn apply(&self, map: &mut MapView) -> crate::Result<()> {
        for (index, entry) in self.base.iter().enumerate() {
            map.set_layer_visible(&entry.layer_id, self.selected_base == Some(index))?;
        }
        for (index, entry) in self.overlays.iter().enumerate() {
            map.set_layer_visible(&entry.layer_id, self.overlay_enabled[index])?;
        }
        Ok(())
    }

    /// Draws the radio buttons and checkboxes, applying any change to the
    /// map immediately.
    pub fn ui(&mut self, ui: &mut egui::Ui, map: &mut MapView) -> crate::Result<()> {
        let mut changed = false;

        ui.label("Base Layers:");
        for (index, entry) in self.base.iter().enumerate() {
            let selected = self.selected_base == Some(index);
            if ui.radio(selected, &entry.label).clicked() && !selected {
                self.selected_base = Some(index);
                changed = true;
            }
        }

        ui.separator();

        ui.label("Overlay Layers:");
        for (index, entry) in self.overlays.iter().enumerate() {
            if ui.checkbox(&mut self.overlay_enabled[index], &entry.label).changed() {
                changed = true;
            }
        }

        if changed {
            self.apply(map)?;
        }
        Ok(())
    }
}
