//! The Noto Peninsula disaster map: fixed view, data sources and layers.
//!
//! [`noto_map`] assembles the whole picture: an OpenStreetMap base,
//! Sentinel-2 imagery from before and after the 2024 earthquake, the
//! Ishikawa section polygons, shelter points and the GSI debris-flow and
//! tsunami hazard rasters, layered in a fixed paint order.

use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::core::map::{MapView, MapViewOptions};
use crate::style::paint::{CirclePaint, Color, FillPaint, LinePaint, PaintValue, ZoomInterpolation};
use crate::style::{LayerDef, RasterTiles, SourceDef};
use crate::Result;

pub const NOTO_CENTER: LatLng = LatLng {
    lat: 37.05,
    lng: 136.92,
};
pub const NOTO_ZOOM: f64 = 8.0;
pub const NOTO_MIN_ZOOM: f64 = 5.0;
pub const NOTO_MAX_ZOOM: f64 = 12.0;

/// Panning is confined to Japan and its surroundings
pub const NOTO_MAX_BOUNDS: LatLngBounds = LatLngBounds {
    south_west: LatLng {
        lat: 20.0,
        lng: 122.0,
    },
    north_east: LatLng {
        lat: 50.0,
        lng: 154.0,
    },
};

/// Where the bundled `/data` files are served from by default
pub const DEFAULT_DATA_BASE_URL: &str = "http://localhost:8080";

pub const SOURCE_OSM: &str = "osm";
pub const SOURCE_ISHIKAWA_SECTION: &str = "ishikawa_section";
pub const SOURCE_SHELTER: &str = "shelter";
pub const SOURCE_CHUBU_NATURAL: &str = "chubu_natural";
pub const SOURCE_DOSEKIRYU: &str = "dosekiryu";
pub const SOURCE_TSUNAMI: &str = "tsunami";
pub const SOURCE_SENTINEL_BEFORE: &str = "sentinel_before";
pub const SOURCE_SENTINEL_AFTER: &str = "sentinel_after";

pub const LAYER_OSM: &str = "osm";
pub const LAYER_SENTINEL_BEFORE: &str = "sentinel_before";
pub const LAYER_SENTINEL_AFTER: &str = "sentinel_after";
pub const LAYER_ISHIKAWA_FILL: &str = "ishikawa_section_fill";
pub const LAYER_ISHIKAWA_LINE: &str = "ishikawa_section_line";
pub const LAYER_SHELTER: &str = "shelter";
pub const LAYER_DOSEKIRYU: &str = "dosekiryu";
pub const LAYER_TSUNAMI: &str = "tsunami";

const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";
const DOSEKIRYU_TILE_URL: &str =
    "https://disaportaldata.gsi.go.jp/raster/05_dosekiryukeikaikuiki_data/17/{z}/{x}/{y}.png";
const TSUNAMI_TILE_URL: &str =
    "https://disaportaldata.gsi.go.jp/raster/04_tsunami_newlegend_data/{z}/{x}/{y}.png";
const HAZARD_ATTRIBUTION: &str = "ハザードマップポータルサイト";

/// Builds the full Noto map with data served from [`DEFAULT_DATA_BASE_URL`].
///
/// Must be called from within the async runtime.
pub fn noto_map() -> Result<MapView> {
    noto_map_with_data_base(DEFAULT_DATA_BASE_URL)
}

/// Builds the full Noto map, fetching the bundled GeoJSON and Sentinel
/// tiles relative to `data_base_url`.
///
/// The OSM base layer is part of the initial style; the overlay layers are
/// appended once the map is initialized, in their fixed paint order.
pub fn noto_map_with_data_base(data_base_url: &str) -> Result<MapView> {
    let base = data_base_url.trim_end_matches('/');

    let mut map = MapView::new(MapViewOptions {
        center: NOTO_CENTER,
        zoom: NOTO_ZOOM,
        size: Point::new(1200.0, 800.0),
        min_zoom: Some(NOTO_MIN_ZOOM),
        max_zoom: Some(NOTO_MAX_ZOOM),
        max_bounds: Some(NOTO_MAX_BOUNDS),
    })?;

    register_sources(&mut map, base)?;
    map.add_layer(LayerDef::raster(LAYER_OSM, SOURCE_OSM))?;

    map.init()?;

    register_overlay_layers(&mut map)?;

    Ok(map)
}

fn register_sources(map: &mut MapView, base: &str) -> Result<()> {
    map.add_source(
        SOURCE_OSM,
        RasterTiles::new(OSM_TILE_URL)?.with_attribution(OSM_ATTRIBUTION),
    )?;
    map.add_source(
        SOURCE_ISHIKAWA_SECTION,
        SourceDef::geojson_url(format!("{}/data/ishikawa-section.geojson", base)),
    )?;
    map.add_source(
        SOURCE_SHELTER,
        SourceDef::geojson_url(format!("{}/data/shelter.geojson", base)),
    )?;
    // Kept in the source set even though no layer draws it yet
    map.add_source(
        SOURCE_CHUBU_NATURAL,
        SourceDef::geojson_url(format!("{}/data/natural.geojson", base)),
    )?;
    map.add_source(
        SOURCE_DOSEKIRYU,
        RasterTiles::new(DOSEKIRYU_TILE_URL)?
            .with_zoom_range(2, 12)?
            .with_attribution(HAZARD_ATTRIBUTION),
    )?;
    map.add_source(
        SOURCE_TSUNAMI,
        RasterTiles::new(TSUNAMI_TILE_URL)?
            .with_zoom_range(2, 17)?
            .with_attribution(HAZARD_ATTRIBUTION),
    )?;
    map.add_source(
        SOURCE_SENTINEL_BEFORE,
        RasterTiles::new(format!("{}/data/sentinel/before/{{z}}/{{x}}/{{y}}.png", base))?,
    )?;
    map.add_source(
        SOURCE_SENTINEL_AFTER,
        RasterTiles::new(format!("{}/data/sentinel/after/{{z}}/{{x}}/{{y}}.png", base))?,
    )?;
    Ok(())
}

fn register_overlay_layers(map: &mut MapView) -> Result<()> {
    map.add_layer(LayerDef::raster(LAYER_SENTINEL_BEFORE, SOURCE_SENTINEL_BEFORE))?;
    map.add_layer(LayerDef::raster(LAYER_SENTINEL_AFTER, SOURCE_SENTINEL_AFTER))?;
    map.add_layer(LayerDef::fill(
        LAYER_ISHIKAWA_FILL,
        SOURCE_ISHIKAWA_SECTION,
        FillPaint {
            color: Color::parse("#ffd700")?,
            opacity: PaintValue::Constant(0.3),
        },
    ))?;
    map.add_layer(LayerDef::line(
        LAYER_ISHIKAWA_LINE,
        SOURCE_ISHIKAWA_SECTION,
        LinePaint {
            color: Color::parse("#ffffff")?,
            opacity: PaintValue::Constant(0.8),
            width: 1.0,
        },
    ))?;
    map.add_layer(LayerDef::circle(
        LAYER_SHELTER,
        SOURCE_SHELTER,
        CirclePaint {
            color: Color::parse("#ff6347")?,
            radius: PaintValue::Constant(5.0),
            opacity: ZoomInterpolation::linear(vec![(5.0, 0.05), (12.0, 0.8)])?.into(),
        },
    ))?;
    map.add_layer(LayerDef::raster(LAYER_DOSEKIRYU, SOURCE_DOSEKIRYU))?;
    map.add_layer(LayerDef::raster(LAYER_TSUNAMI, SOURCE_TSUNAMI))?;
    Ok(())
}

/// The base/overlay opacity control, wired to the Noto layers with their
/// Japanese labels. Base imagery is exclusive; overlays toggle freely.
#[cfg(feature = "egui")]
pub fn noto_layer_control() -> crate::ui::controls::LayerControl {
    use crate::ui::controls::{LayerControl, LayerEntry};

    LayerControl::new(
        vec![
            LayerEntry::new(LAYER_SENTINEL_BEFORE, "光学画像（災害前）"),
            LayerEntry::new(LAYER_SENTINEL_AFTER, "光学画像（災害後）"),
        ],
        vec![
            LayerEntry::new(LAYER_ISHIKAWA_FILL, "地域区画 (polygon)"),
            LayerEntry::new(LAYER_ISHIKAWA_LINE, "地域区画 (line)"),
            LayerEntry::new(LAYER_DOSEKIRYU, "土石流警戒区域"),
            LayerEntry::new(LAYER_TSUNAMI, "津波警戒区域"),
            LayerEntry::new(LAYER_SHELTER, "避難所"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{LayerKind, SourceDef};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sources_registered_in_order() {
        let map = noto_map_with_data_base("http://127.0.0.1:9").unwrap();

        let ids: Vec<&str> = map.style().source_ids().collect();
        assert_eq!(
            ids,
            vec![
                SOURCE_OSM,
                SOURCE_ISHIKAWA_SECTION,
                SOURCE_SHELTER,
                SOURCE_CHUBU_NATURAL,
                SOURCE_DOSEKIRYU,
                SOURCE_TSUNAMI,
                SOURCE_SENTINEL_BEFORE,
                SOURCE_SENTINEL_AFTER,
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_layers_in_paint_order() {
        let map = noto_map_with_data_base("http://127.0.0.1:9").unwrap();

        let ids: Vec<&str> = map
            .style()
            .layers()
            .iter()
            .map(|layer| layer.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec![
                LAYER_OSM,
                LAYER_SENTINEL_BEFORE,
                LAYER_SENTINEL_AFTER,
                LAYER_ISHIKAWA_FILL,
                LAYER_ISHIKAWA_LINE,
                LAYER_SHELTER,
                LAYER_DOSEKIRYU,
                LAYER_TSUNAMI,
            ]
        );

        assert!(map.is_ready());
        for id in ids {
            assert!(map.layer_visible(id));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fixed_view() {
        let mut map = noto_map_with_data_base("http://127.0.0.1:9").unwrap();

        assert_eq!(map.viewport().center, NOTO_CENTER);
        assert_eq!(map.viewport().zoom, NOTO_ZOOM);

        // Zoom and panning stay inside the configured limits
        map.set_view(LatLng::new(37.05, 136.92), 20.0).unwrap();
        assert_eq!(map.viewport().zoom, NOTO_MAX_ZOOM);

        map.set_view(LatLng::new(60.0, 170.0), 8.0).unwrap();
        assert!(NOTO_MAX_BOUNDS.contains(&map.viewport().center));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hazard_sources_zoom_ranges() {
        let map = noto_map_with_data_base("http://127.0.0.1:9").unwrap();

        let Some(SourceDef::Raster(dosekiryu)) = map.style().source(SOURCE_DOSEKIRYU) else {
            panic!("dosekiryu source missing");
        };
        assert_eq!((dosekiryu.min_zoom, dosekiryu.max_zoom), (2, 12));
        assert_eq!(dosekiryu.attribution.as_deref(), Some(HAZARD_ATTRIBUTION));

        let Some(SourceDef::Raster(tsunami)) = map.style().source(SOURCE_TSUNAMI) else {
            panic!("tsunami source missing");
        };
        assert_eq!((tsunami.min_zoom, tsunami.max_zoom), (2, 17));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shelter_paint() {
        let map = noto_map_with_data_base("http://127.0.0.1:9").unwrap();

        let shelter = map
            .style()
            .layers()
            .iter()
            .find(|layer| layer.id == LAYER_SHELTER)
            .unwrap();
        let LayerKind::Circle(paint) = &shelter.kind else {
            panic!("shelter should be a circle layer");
        };

        assert_eq!(paint.color, Color::rgb(255, 99, 71));
        assert!((paint.opacity.eval(5.0) - 0.05).abs() < 1e-9);
        assert!((paint.opacity.eval(12.0) - 0.8).abs() < 1e-9);
        assert!((paint.radius.eval(8.0) - 5.0).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_chubu_natural_has_no_layer() {
        let map = noto_map_with_data_base("http://127.0.0.1:9").unwrap();

        assert!(map.has_source(SOURCE_CHUBU_NATURAL));
        assert!(map
            .style()
            .layers()
            .iter()
            .all(|layer| layer.source != SOURCE_CHUBU_NATURAL));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sentinel_templates_use_data_base() {
        let map = noto_map_with_data_base("http://tiles.example.test/").unwrap();

        let Some(SourceDef::Raster(before)) = map.style().source(SOURCE_SENTINEL_BEFORE) else {
            panic!("sentinel_before source missing");
        };
        assert_eq!(
            before.template.as_str(),
            "http://tiles.example.test/data/sentinel/before/{z}/{x}/{y}.png"
        );
    }

    #[cfg(feature = "egui")]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_layer_control_matches_census() {
        let map = noto_map_with_data_base("http://127.0.0.1:9").unwrap();
        let control = noto_layer_control();

        for entry in control.base_entries().iter().chain(control.overlay_entries()) {
            assert!(map.has_layer(&entry.layer_id), "missing {}", entry.layer_id);
        }
        assert_eq!(control.base_entries().len(), 2);
        assert_eq!(control.overlay_entries().len(), 5);
    }
}
