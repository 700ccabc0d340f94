//! Damage-inference panel: a heading, the generate button and the last
//! error, if any.

use crate::ai::overlay::OverlayGenerator;

pub const PANEL_HEADING: &str = "被害状況の推論";
pub const GENERATE_BUTTON_LABEL: &str = "GeoJSONを生成";
pub const GENERATE_BUSY_LABEL: &str = "生成中...";

const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(0xdc, 0x35, 0x45);

/// Draws the panel that triggers overlay generation.
///
/// The button is disabled while a request is in flight. Clicking it starts
/// a request through the generator; [`OverlayGenerator::poll`] must run
/// elsewhere in the frame loop for the result to land on the map.
pub fn generate_panel(ui: &mut egui::Ui, generator: &mut OverlayGenerator) {
    ui.strong(PANEL_HEADING);

    let busy = generator.is_busy();
    let label = if busy {
        GENERATE_BUSY_LABEL
    } else {
        GENERATE_BUTTON_LABEL
    };
    if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
        generator.generate();
    }

    if let Some(error) = generator.error() {
        ui.colored_label(ERROR_COLOR, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_japanese() {
        assert_eq!(PANEL_HEADING, "被害状況の推論");
        assert_eq!(GENERATE_BUTTON_LABEL, "GeoJSONを生成");
        assert_eq!(GENERATE_BUSY_LABEL, "生成中...");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_panel_renders_idle_generator() {
        let mut generator = OverlayGenerator::new();

        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                generate_panel(ui, &mut generator);
            });
        });

        assert!(!generator.is_busy());
        assert!(generator.error().is_none());
    }
}
