use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point, TileCoord},
        viewport::Viewport,
    },
    data::{geojson::GeoJson, loader::DataLoader},
    prelude::{HashMap, HashSet},
    style::{GeoJsonData, LayerDef, LayerKind, SourceDef, Style},
    tiles::{cache::TileCache, loader::TileLoader, loader::TileLoaderConfig},
    Result,
};
use std::sync::Arc;

/// Where the map is in its startup sequence.
///
/// A map starts `Uninitialized`: sources and layers can be registered but
/// nothing is fetched. [`MapView::init`] moves it to `Ready`, schedules the
/// pending GeoJSON fetches, and lets tile loading begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
}

#[derive(Debug, Clone)]
pub struct MapViewOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub size: Point,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub max_bounds: Option<LatLngBounds>,
}

impl Default for MapViewOptions {
    fn default() -> Self {
        Self {
            center: LatLng::new(0.0, 0.0),
            zoom: 1.0,
            size: Point::new(800.0, 600.0),
            min_zoom: None,
            max_zoom: None,
            max_bounds: None,
        }
    }
}

/// Load state of one GeoJSON source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceData {
    Loading,
    Ready(GeoJson),
    Failed,
}

/// A map with a style, a viewport, and background loading for its sources.
///
/// Construct one per map on screen; all state lives in the value itself.
#[derive(Debug)]
pub struct MapView {
    viewport: Viewport,
    style: Style,
    lifecycle: Lifecycle,
    layer_visibility: HashMap<String, bool>,
    source_data: HashMap<String, SourceData>,
    tile_loader: TileLoader,
    tile_caches: HashMap<String, TileCache>,
    failed_tiles: HashMap<String, HashSet<TileCoord>>,
    data_loader: DataLoader,
}

impl MapView {
    /// Creates a map view.
    ///
    /// Must be called from within the async runtime; the view spawns its
    /// download workers on creation.
    pub fn new(options: MapViewOptions) -> Result<Self> {
        Self::with_loader_config(options, TileLoaderConfig::default())
    }

    /// Creates a map view with small worker limits and short timeouts
    pub fn for_testing(options: MapViewOptions) -> Result<Self> {
        Self::with_loader_config(options, TileLoaderConfig::for_testing())
    }

    fn with_loader_config(options: MapViewOptions, config: TileLoaderConfig) -> Result<Self> {
        if !options.center.is_valid() {
            return Err(crate::Error::InvalidCoordinates(format!(
                "invalid map center: ({}, {})",
                options.center.lat, options.center.lng
            )));
        }

        let mut viewport = Viewport::new(options.center, options.zoom, options.size);
        if let (Some(min), Some(max)) = (options.min_zoom, options.max_zoom) {
            viewport.set_zoom_limits(min, max);
        }
        if let Some(bounds) = options.max_bounds {
            viewport.set_max_bounds(Some(bounds), Some(1.0));
        }

        Ok(Self {
            viewport,
            style: Style::default(),
            lifecycle: Lifecycle::Uninitialized,
            layer_visibility: HashMap::default(),
            source_data: HashMap::default(),
            tile_loader: TileLoader::new(config),
            tile_caches: HashMap::default(),
            failed_tiles: HashMap::default(),
            data_loader: DataLoader::new(),
        })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    /// Finishes startup: schedules fetches for every URL-backed GeoJSON
    /// source registered so far and unblocks tile loading.
    ///
    /// Fails if called more than once.
    pub fn init(&mut self) -> Result<()> {
        if self.lifecycle == Lifecycle::Ready {
            return Err(crate::Error::Lifecycle(
                "map is already initialized".to_string(),
            ));
        }

        for (id, source) in self.style.sources() {
            if let SourceDef::GeoJson {
                data: GeoJsonData::Url(url),
            } = source
            {
                if matches!(self.source_data.get(id), Some(SourceData::Loading)) {
                    self.data_loader.fetch(id, url);
                }
            }
        }

        self.lifecycle = Lifecycle::Ready;
        Ok(())
    }

    /// Registers a source under a unique id.
    ///
    /// Raster sources get a tile cache. Inline GeoJSON is available at once;
    /// URL-backed GeoJSON starts fetching now if the map is ready, otherwise
    /// when [`init`](Self::init) runs.
    pub fn add_source(&mut self, id: &str, source: impl Into<SourceDef>) -> Result<()> {
        self.style.add_source(id, source.into())?;

        match self.style.source(id) {
            Some(SourceDef::Raster(_)) => {
                self.tile_caches
                    .insert(id.to_string(), TileCache::with_default_capacity());
            }
            Some(SourceDef::GeoJson {
                data: GeoJsonData::Inline(doc),
            }) => {
                let doc = doc.clone();
                self.source_data
                    .insert(id.to_string(), SourceData::Ready(doc));
            }
            Some(SourceDef::GeoJson {
                data: GeoJsonData::Url(url),
            }) => {
                if self.lifecycle == Lifecycle::Ready {
                    self.data_loader.fetch(id, url);
                }
                self.source_data
                    .insert(id.to_string(), SourceData::Loading);
            }
            None => {}
        }

        Ok(())
    }

    /// Appends a layer; paint order is insertion order.
    ///
    /// The layer's source must already exist and its kind must be able to
    /// draw from that source. New layers start visible.
    pub fn add_layer(&mut self, layer: LayerDef) -> Result<()> {
        let id = layer.id.clone();
        self.style.add_layer(layer)?;
        self.layer_visibility.insert(id, true);
        Ok(())
    }

    /// Replaces the data of a GeoJSON source
    pub fn set_geojson(&mut self, source_id: &str, data: GeoJson) -> Result<()> {
        match self.style.source(source_id) {
            Some(source) if source.is_geojson() => {
                self.source_data
                    .insert(source_id.to_string(), SourceData::Ready(data));
                Ok(())
            }
            Some(source) => Err(crate::Error::Style(format!(
                "source '{}' is a {} source, not geojson",
                source_id,
                source.kind_name()
            ))),
            None => Err(crate::Error::Style(format!(
                "unknown source '{}'",
                source_id
            ))),
        }
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) -> Result<()> {
        if !center.is_valid() {
            return Err(crate::Error::InvalidCoordinates(format!(
                "invalid view center: ({}, {})",
                center.lat, center.lng
            )));
        }
        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);
        Ok(())
    }

    pub fn set_layer_visible(&mut self, layer_id: &str, visible: bool) -> Result<()> {
        if !self.style.has_layer(layer_id) {
            return Err(crate::Error::Style(format!("unknown layer '{}'", layer_id)));
        }
        self.layer_visibility.insert(layer_id.to_string(), visible);
        Ok(())
    }

    pub fn layer_visible(&self, layer_id: &str) -> bool {
        self.layer_visibility
            .get(layer_id)
            .copied()
            .unwrap_or(false)
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.style.has_source(id)
    }

    pub fn has_layer(&self, id: &str) -> bool {
        self.style.has_layer(id)
    }

    /// Data of a GeoJSON source, once it has loaded
    pub fn geojson(&self, source_id: &str) -> Option<&GeoJson> {
        match self.source_data.get(source_id) {
            Some(SourceData::Ready(doc)) => Some(doc),
            _ => None,
        }
    }

    pub fn source_state(&self, source_id: &str) -> Option<&SourceData> {
        self.source_data.get(source_id)
    }

    /// Queues downloads for every tile the viewport needs but does not have.
    ///
    /// Walks visible raster layers in paint order, clamps the viewport zoom
    /// to each source's range, and requests center-out so the middle of the
    /// screen fills first. Does nothing before [`init`](Self::init).
    pub fn update_tiles(&self) {
        if self.lifecycle != Lifecycle::Ready {
            return;
        }

        for layer in self.style.layers() {
            if !matches!(layer.kind, LayerKind::Raster(_)) || !self.layer_visible(&layer.id) {
                continue;
            }
            let Some(SourceDef::Raster(raster)) = self.style.source(&layer.source) else {
                continue;
            };
            let Some(cache) = self.tile_caches.get(&layer.source) else {
                continue;
            };

            let zoom = raster.clamp_zoom(self.viewport.zoom);
            let center_tile = TileCoord::from_lat_lng(&self.viewport.center, zoom);
            let center = Point::new(center_tile.x as f64, center_tile.y as f64);
            let failed = self.failed_tiles.get(&layer.source);

            let mut wanted: Vec<TileCoord> = self
                .viewport
                .visible_tiles(zoom)
                .into_iter()
                .filter(|coord| !cache.contains(coord))
                .filter(|coord| failed.map_or(true, |failed| !failed.contains(coord)))
                .collect();
            wanted.sort_by(|a, b| {
                let da = Point::new(a.x as f64, a.y as f64).distance_to(&center);
                let db = Point::new(b.x as f64, b.y as f64).distance_to(&center);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });

            self.tile_loader
                .queue_tiles(&layer.source, &raster.template, &wanted);
        }
    }

    /// Drains finished downloads into caches and source data.
    ///
    /// Load failures are logged and remembered, never retried. Returns true
    /// when something arrived that changes what the map draws.
    pub fn poll_results(&mut self) -> bool {
        let mut changed = false;

        for result in self.tile_loader.try_recv_results() {
            match result.data {
                Ok(bytes) => {
                    if let Some(cache) = self.tile_caches.get(&result.source) {
                        cache.insert(result.coord, bytes);
                        changed = true;
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Tile {}/{}/{} for source '{}' failed: {}",
                        result.coord.z,
                        result.coord.x,
                        result.coord.y,
                        result.source,
                        e
                    );
                    self.failed_tiles
                        .entry(result.source)
                        .or_default()
                        .insert(result.coord);
                }
            }
        }

        for result in self.data_loader.try_recv_results() {
            match result.data {
                Ok(doc) => {
                    self.source_data
                        .insert(result.source, SourceData::Ready(doc));
                    changed = true;
                }
                Err(e) => {
                    log::warn!("GeoJSON source '{}' failed to load: {}", result.source, e);
                    self.source_data.insert(result.source, SourceData::Failed);
                }
            }
        }

        changed
    }

    pub fn cached_tile(&self, source_id: &str, coord: &TileCoord) -> Option<Arc<Vec<u8>>> {
        self.tile_caches.get(source_id)?.get(coord)
    }

    /// Number of tile downloads queued or in flight
    pub fn pending_tiles(&self) -> usize {
        self.tile_loader.pending_count()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::geojson::{GeoJsonFeature, GeoJsonGeometry};
    use crate::style::{LayerDef, RasterTiles};
    use std::time::Duration;

    fn noto_options() -> MapViewOptions {
        MapViewOptions {
            center: LatLng::new(37.05, 136.92),
            zoom: 8.0,
            size: Point::new(800.0, 600.0),
            min_zoom: Some(5.0),
            max_zoom: Some(12.0),
            max_bounds: Some(LatLngBounds::from_coords(20.0, 122.0, 50.0, 154.0)),
        }
    }

    fn unreachable_raster() -> RasterTiles {
        RasterTiles::new("http://127.0.0.1:9/{z}/{x}/{y}.png").unwrap()
    }

    fn point_collection(lng: f64, lat: f64) -> GeoJson {
        GeoJson::FeatureCollection {
            name: None,
            features: vec![GeoJsonFeature {
                id: None,
                properties: None,
                geometry: Some(GeoJsonGeometry::Point {
                    coordinates: [lng, lat],
                }),
            }],
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_map_creation() {
        let map = MapView::for_testing(noto_options()).unwrap();

        assert_eq!(map.viewport().center, LatLng::new(37.05, 136.92));
        assert_eq!(map.viewport().zoom, 8.0);
        assert_eq!(map.lifecycle(), Lifecycle::Uninitialized);
        assert!(!map.is_ready());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejects_invalid_center() {
        let options = MapViewOptions {
            center: LatLng::new(95.0, 136.92),
            ..noto_options()
        };

        let err = MapView::for_testing(options).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidCoordinates(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_zoom_limits_clamp_view() {
        let mut map = MapView::for_testing(noto_options()).unwrap();

        map.set_view(LatLng::new(37.05, 136.92), 2.0).unwrap();
        assert_eq!(map.viewport().zoom, 5.0);

        map.set_view(LatLng::new(37.05, 136.92), 15.0).unwrap();
        assert_eq!(map.viewport().zoom, 12.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_source_and_layer_registration() {
        let mut map = MapView::for_testing(noto_options()).unwrap();

        map.add_source("osm", unreachable_raster()).unwrap();
        assert!(map.has_source("osm"));

        map.add_layer(LayerDef::raster("osm", "osm")).unwrap();
        assert!(map.has_layer("osm"));
        assert!(map.layer_visible("osm"));

        let err = map
            .add_layer(LayerDef::raster("orphan", "missing"))
            .unwrap_err();
        assert!(err.to_string().contains("unknown source"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_layer_visibility_toggle() {
        let mut map = MapView::for_testing(noto_options()).unwrap();
        map.add_source("osm", unreachable_raster()).unwrap();
        map.add_layer(LayerDef::raster("osm", "osm")).unwrap();

        map.set_layer_visible("osm", false).unwrap();
        assert!(!map.layer_visible("osm"));

        map.set_layer_visible("osm", true).unwrap();
        assert!(map.layer_visible("osm"));

        assert!(map.set_layer_visible("missing", true).is_err());
        assert!(!map.layer_visible("missing"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_init_runs_once() {
        let mut map = MapView::for_testing(noto_options()).unwrap();

        map.init().unwrap();
        assert!(map.is_ready());

        let err = map.init().unwrap_err();
        assert!(matches!(err, crate::Error::Lifecycle(_)));
        assert!(map.is_ready());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_inline_geojson_is_ready_immediately() {
        let mut map = MapView::for_testing(noto_options()).unwrap();
        let doc = point_collection(136.95, 37.3);

        map.add_source("damage", doc.clone()).unwrap();
        assert_eq!(map.geojson("damage"), Some(&doc));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_geojson_validates_source() {
        let mut map = MapView::for_testing(noto_options()).unwrap();
        map.add_source("osm", unreachable_raster()).unwrap();

        let doc = point_collection(136.95, 37.3);
        assert!(map.set_geojson("missing", doc.clone()).is_err());

        let err = map.set_geojson("osm", doc.clone()).unwrap_err();
        assert!(err.to_string().contains("not geojson"));

        map.add_source("damage", point_collection(137.0, 37.2))
            .unwrap();
        map.set_geojson("damage", doc.clone()).unwrap();
        assert_eq!(map.geojson("damage"), Some(&doc));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_url_source_waits_for_init_then_fails() {
        let mut map = MapView::for_testing(noto_options()).unwrap();
        map.add_source(
            "shelter",
            crate::style::SourceDef::geojson_url("http://127.0.0.1:9/data/shelter.geojson"),
        )
        .unwrap();
        assert_eq!(map.source_state("shelter"), Some(&SourceData::Loading));

        // Nothing is fetched before init, so the state stays Loading
        tokio::time::sleep(Duration::from_millis(50)).await;
        map.poll_results();
        assert_eq!(map.source_state("shelter"), Some(&SourceData::Loading));

        map.init().unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while map.source_state("shelter") == Some(&SourceData::Loading)
            && std::time::Instant::now() < deadline
        {
            map.poll_results();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(map.source_state("shelter"), Some(&SourceData::Failed));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tile_updates_record_failures() {
        let mut map = MapView::for_testing(noto_options()).unwrap();
        map.add_source("osm", unreachable_raster()).unwrap();
        map.add_layer(LayerDef::raster("osm", "osm")).unwrap();

        // Uninitialized maps do not load tiles
        map.update_tiles();
        assert_eq!(map.pending_tiles(), 0);

        map.init().unwrap();
        map.update_tiles();
        assert!(map.pending_tiles() > 0);

        let deadline = std::time::Instant::now() + Duration::from_secs(30);
        while map.pending_tiles() > 0 && std::time::Instant::now() < deadline {
            map.poll_results();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(map.pending_tiles(), 0);

        // Failed tiles are remembered and not requeued
        map.update_tiles();
        assert_eq!(map.pending_tiles(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hidden_raster_layer_requests_nothing() {
        let mut map = MapView::for_testing(noto_options()).unwrap();
        map.add_source("osm", unreachable_raster()).unwrap();
        map.add_layer(LayerDef::raster("osm", "osm")).unwrap();
        map.init().unwrap();

        map.set_layer_visible("osm", false).unwrap();
        map.update_tiles();
        assert_eq!(map.pending_tiles(), 0);
    }
}
