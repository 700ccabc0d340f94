use crate::style::paint::{CirclePaint, FillPaint, LinePaint, RasterPaint};
use crate::style::source::SourceDef;
use serde::{Deserialize, Serialize};

/// The closed set of layer kinds the renderer understands, each carrying
/// its paint properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Raster(RasterPaint),
    Fill(FillPaint),
    Line(LinePaint),
    Circle(CirclePaint),
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Raster(_) => "raster",
            LayerKind::Fill(_) => "fill",
            LayerKind::Line(_) => "line",
            LayerKind::Circle(_) => "circle",
        }
    }

    /// Whether this layer kind can render from the given source
    pub fn compatible_with(&self, source: &SourceDef) -> bool {
        match self {
            LayerKind::Raster(_) => source.is_raster(),
            LayerKind::Fill(_) | LayerKind::Line(_) | LayerKind::Circle(_) => source.is_geojson(),
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A style layer: an id, the source it draws from and how it is painted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub id: String,
    pub source: String,
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl LayerDef {
    /// A raster layer with default paint (full opacity)
    pub fn raster(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self::raster_with(id, source, RasterPaint::default())
    }

    pub fn raster_with(
        id: impl Into<String>,
        source: impl Into<String>,
        paint: RasterPaint,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: LayerKind::Raster(paint),
        }
    }

    pub fn fill(id: impl Into<String>, source: impl Into<String>, paint: FillPaint) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: LayerKind::Fill(paint),
        }
    }

    pub fn line(id: impl Into<String>, source: impl Into<String>, paint: LinePaint) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: LayerKind::Line(paint),
        }
    }

    pub fn circle(id: impl Into<String>, source: impl Into<String>, paint: CirclePaint) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: LayerKind::Circle(paint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::source::RasterTiles;

    #[test]
    fn test_layer_kind_names() {
        assert_eq!(LayerDef::raster("osm", "osm").kind.name(), "raster");
        assert_eq!(
            LayerDef::circle("shelter", "shelter", CirclePaint::default())
                .kind
                .to_string(),
            "circle"
        );
    }

    #[test]
    fn test_kind_source_compatibility() {
        let raster_source: SourceDef = RasterTiles::new("https://tile.example.com/{z}/{x}/{y}.png")
            .unwrap()
            .into();
        let geojson_source = SourceDef::geojson_url("/data/shelter.geojson");

        let raster_layer = LayerDef::raster("osm", "osm");
        let circle_layer = LayerDef::circle("shelter", "shelter", CirclePaint::default());

        assert!(raster_layer.kind.compatible_with(&raster_source));
        assert!(!raster_layer.kind.compatible_with(&geojson_source));
        assert!(circle_layer.kind.compatible_with(&geojson_source));
        assert!(!circle_layer.kind.compatible_with(&raster_source));
    }
}
