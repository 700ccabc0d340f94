//! egui widgets: the map itself, the base/overlay switcher and the
//! generation panel.

pub mod controls;
pub mod panel;
pub mod widget;

pub use controls::{LayerControl, LayerEntry};
pub use panel::generate_panel;
pub use widget::MapWidget;
