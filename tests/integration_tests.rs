//! End-to-end tests for the assembled Noto map and the overlay generator.
//!
//! These run against unreachable servers on purpose: source loads fail and
//! get logged, which is exactly what the viewer does when the data server
//! is down.

use notomap::ai::client::GeminiConfig;
use notomap::ai::overlay::{
    self, OverlayGenerator, GENERATED_LAYER_ID, GENERATED_SOURCE_ID, GENERATION_FAILED_MESSAGE,
};
use notomap::bootstrap;
use notomap::{GeoJson, MapError, MapView};
use std::time::{Duration, Instant};

fn offline_map() -> MapView {
    bootstrap::noto_map_with_data_base("http://127.0.0.1:9").unwrap()
}

fn sample_damage_report() -> GeoJson {
    GeoJson::from_str(
        r#"{
            "type": "FeatureCollection",
            "name": "17",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [ 136.6481028, 36.55282538 ]
                    }
                }
            ]
        }"#,
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn assembled_map_has_full_census() {
    let map = offline_map();

    let sources: Vec<&str> = map.style().source_ids().collect();
    assert_eq!(
        sources,
        vec![
            bootstrap::SOURCE_OSM,
            bootstrap::SOURCE_ISHIKAWA_SECTION,
            bootstrap::SOURCE_SHELTER,
            bootstrap::SOURCE_CHUBU_NATURAL,
            bootstrap::SOURCE_DOSEKIRYU,
            bootstrap::SOURCE_TSUNAMI,
            bootstrap::SOURCE_SENTINEL_BEFORE,
            bootstrap::SOURCE_SENTINEL_AFTER,
        ]
    );

    let layers: Vec<&str> = map
        .style()
        .layers()
        .iter()
        .map(|layer| layer.id.as_str())
        .collect();
    assert_eq!(
        layers,
        vec![
            bootstrap::LAYER_OSM,
            bootstrap::LAYER_SENTINEL_BEFORE,
            bootstrap::LAYER_SENTINEL_AFTER,
            bootstrap::LAYER_ISHIKAWA_FILL,
            bootstrap::LAYER_ISHIKAWA_LINE,
            bootstrap::LAYER_SHELTER,
            bootstrap::LAYER_DOSEKIRYU,
            bootstrap::LAYER_TSUNAMI,
        ]
    );

    // The generated overlay only exists after a successful generation
    assert!(!map.has_source(GENERATED_SOURCE_ID));
    assert!(!map.has_layer(GENERATED_LAYER_ID));
}

#[tokio::test(flavor = "multi_thread")]
async fn assembled_map_initializes_exactly_once() {
    let mut map = offline_map();
    assert!(map.is_ready());

    let err = map.init().unwrap_err();
    assert!(matches!(err, MapError::Lifecycle(_)));
    assert!(map.is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn generated_overlay_is_created_then_replaced() {
    let mut map = offline_map();

    overlay::apply_document(&mut map, sample_damage_report()).unwrap();

    assert!(map.has_source(GENERATED_SOURCE_ID));
    assert!(map.has_layer(GENERATED_LAYER_ID));
    assert!(map.layer_visible(GENERATED_LAYER_ID));
    assert_eq!(map.geojson(GENERATED_SOURCE_ID).unwrap().feature_count(), 1);

    // The layer census gained exactly one layer, at the end of paint order
    let layers: Vec<&str> = map
        .style()
        .layers()
        .iter()
        .map(|layer| layer.id.as_str())
        .collect();
    assert_eq!(layers.len(), 9);
    assert_eq!(layers.last(), Some(&GENERATED_LAYER_ID));

    // A second document swaps the data without touching the census
    let replacement = GeoJson::from_str(
        r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [136.95, 37.3] } },
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [137.1, 37.4] } }
            ]
        }"#,
    )
    .unwrap();
    overlay::apply_document(&mut map, replacement).unwrap();

    assert_eq!(map.geojson(GENERATED_SOURCE_ID).unwrap().feature_count(), 2);
    assert_eq!(map.style().layer_count(), 9);

    let points = map.geojson(GENERATED_SOURCE_ID).unwrap().point_coordinates();
    assert_eq!(points.len(), 2);
    assert!((points[0].lng - 136.95).abs() < 1e-9);
    assert!((points[0].lat - 37.3).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_generation_sets_error_and_leaves_map_unchanged() {
    let mut map = offline_map();
    let mut generator = OverlayGenerator::with_config(GeminiConfig::new("invalid-key"));

    assert!(!generator.is_busy());
    generator.generate();
    assert!(generator.is_busy());

    // Starting again while busy is a no-op
    generator.generate();
    assert_eq!(generator.requests_started(), 1);

    let deadline = Instant::now() + Duration::from_secs(60);
    let mut settled = false;
    while !settled && Instant::now() < deadline {
        settled = generator.poll(&mut map);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(settled, "generation request never settled");
    assert!(!generator.is_busy());
    assert_eq!(generator.error(), Some(GENERATION_FAILED_MESSAGE));

    // Nothing was added to the map
    assert!(!map.has_source(GENERATED_SOURCE_ID));
    assert!(!map.has_layer(GENERATED_LAYER_ID));
    assert_eq!(map.style().layer_count(), 8);

    // A fresh request clears the error
    generator.generate();
    assert!(generator.error().is_none());
    assert_eq!(generator.requests_started(), 2);
}

#[cfg(feature = "egui")]
#[tokio::test(flavor = "multi_thread")]
async fn viewer_frame_renders_all_panels() {
    use notomap::ui::{generate_panel, MapWidget};

    let mut map = offline_map();
    let mut control = bootstrap::noto_layer_control();
    control.apply(&mut map).unwrap();

    // Startup visibility: first base entry shown, the other hidden
    assert!(map.layer_visible(bootstrap::LAYER_OSM));
    assert!(map.layer_visible(bootstrap::LAYER_SENTINEL_BEFORE));
    assert!(!map.layer_visible(bootstrap::LAYER_SENTINEL_AFTER));
    assert!(map.layer_visible(bootstrap::LAYER_SHELTER));

    let mut generator = OverlayGenerator::with_config(GeminiConfig::new("invalid-key"));

    let ctx = egui::Context::default();
    for _ in 0..2 {
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::SidePanel::left("layer_panel").show(ctx, |ui| {
                control.ui(ui, &mut map).unwrap();
            });
            egui::SidePanel::right("generate_panel").show(ctx, |ui| {
                generate_panel(ui, &mut generator);
            });
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.add(MapWidget::new(&mut map));
            });
        });
    }

    // The widget saw a ready map and queued tile downloads
    assert!(map.pending_tiles() > 0);
}
