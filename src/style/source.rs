use crate::data::geojson::GeoJson;
use crate::tiles::source::TileUrlTemplate;
use serde::{Deserialize, Serialize};

/// Where a GeoJSON source gets its document from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJsonData {
    /// Fetched asynchronously once the map is initialized
    Url(String),
    /// Supplied inline, available immediately
    Inline(GeoJson),
}

/// A raster tile source: URL template plus tiling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterTiles {
    pub template: TileUrlTemplate,
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub attribution: Option<String>,
}

impl RasterTiles {
    /// Creates a raster source from a `{z}/{x}/{y}` URL template
    pub fn new(template: impl Into<String>) -> crate::Result<Self> {
        Ok(Self {
            template: TileUrlTemplate::new(template)?,
            tile_size: 256,
            min_zoom: 0,
            max_zoom: 18,
            attribution: None,
        })
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Restricts the zoom levels this source serves tiles for
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> crate::Result<Self> {
        if min_zoom > max_zoom {
            return Err(crate::Error::Style(format!(
                "raster zoom range {}..{} is inverted",
                min_zoom, max_zoom
            )));
        }
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        Ok(self)
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    /// Clamps a viewport zoom into this source's tile zoom range
    pub fn clamp_zoom(&self, zoom: f64) -> u8 {
        (zoom.floor() as i64).clamp(self.min_zoom as i64, self.max_zoom as i64) as u8
    }
}

/// A map data source, validated at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceDef {
    Raster(RasterTiles),
    GeoJson { data: GeoJsonData },
}

impl SourceDef {
    /// A GeoJSON source that loads its document from a URL
    pub fn geojson_url(url: impl Into<String>) -> Self {
        SourceDef::GeoJson {
            data: GeoJsonData::Url(url.into()),
        }
    }

    /// A GeoJSON source with an inline document
    pub fn geojson(document: GeoJson) -> Self {
        SourceDef::GeoJson {
            data: GeoJsonData::Inline(document),
        }
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, SourceDef::Raster(_))
    }

    pub fn is_geojson(&self) -> bool {
        matches!(self, SourceDef::GeoJson { .. })
    }

    pub fn as_raster(&self) -> Option<&RasterTiles> {
        match self {
            SourceDef::Raster(raster) => Some(raster),
            SourceDef::GeoJson { .. } => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SourceDef::Raster(_) => "raster",
            SourceDef::GeoJson { .. } => "geojson",
        }
    }
}

impl From<RasterTiles> for SourceDef {
    fn from(raster: RasterTiles) -> Self {
        SourceDef::Raster(raster)
    }
}

impl From<GeoJson> for SourceDef {
    fn from(document: GeoJson) -> Self {
        SourceDef::geojson(document)
    }
}
