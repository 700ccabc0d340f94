use notomap::ai::overlay::OverlayGenerator;
use notomap::bootstrap;
use notomap::core::map::MapView;
use notomap::ui::{controls::LayerControl, panel::generate_panel, widget::MapWidget};

/// Noto Peninsula disaster map viewer
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // The bundled GeoJSON and Sentinel tiles are served separately; point
    // NOTOMAP_DATA_URL at that server to override the default.
    let data_base_url = std::env::var("NOTOMAP_DATA_URL")
        .unwrap_or_else(|_| bootstrap::DEFAULT_DATA_BASE_URL.to_string());
    log::info!("loading map data from {}", data_base_url);

    let mut map = bootstrap::noto_map_with_data_base(&data_base_url)?;
    let control = bootstrap::noto_layer_control();
    control.apply(&mut map)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Notomap - Noto Peninsula Disaster Map"),
        ..Default::default()
    };

    eframe::run_native(
        "notomap-app",
        options,
        Box::new(move |_cc| Box::new(NotoApp::new(map, control))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run viewer: {e}"))?;

    Ok(())
}

struct NotoApp {
    map: MapView,
    control: LayerControl,
    generator: OverlayGenerator,
}

impl NotoApp {
    fn new(map: MapView, control: LayerControl) -> Self {
        Self {
            map,
            control,
            generator: OverlayGenerator::new(),
        }
    }
}

impl eframe::App for NotoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // A finished generation changes the map, so redraw right away
        if self.generator.poll(&mut self.map) {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label("能登半島被害状況");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let viewport = self.map.viewport();
                    ui.label(format!(
                        "Center: {:.4}, {:.4} | Zoom: {:.2}",
                        viewport.center.lat, viewport.center.lng, viewport.zoom
                    ));
                });
            });
        });

        egui::SidePanel::left("layer_panel")
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("Layers");
                ui.separator();

                if let Err(e) = self.control.ui(ui, &mut self.map) {
                    log::error!("layer toggle failed: {}", e);
                }
            });

        egui::SidePanel::right("generate_panel")
            .resizable(true)
            .show(ctx, |ui| {
                generate_panel(ui, &mut self.generator);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add(MapWidget::new(&mut self.map));
        });
    }
}
