//! Style model: sources and layers in paint order, validated as they are added
//!
//! A [`Style`] owns the source registry and the ordered layer list. Every
//! mutation is checked up front so a style can never reference a missing
//! source, reuse an id, or pair a layer kind with the wrong source kind.

pub mod layer;
pub mod paint;
pub mod source;

pub use layer::{LayerDef, LayerKind};
pub use source::{GeoJsonData, RasterTiles, SourceDef};

/// Sources and layers for a map, in registration and paint order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    sources: Vec<(String, SourceDef)>,
    layers: Vec<LayerDef>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source under a unique, non-empty id
    pub fn add_source(
        &mut self,
        id: impl Into<String>,
        source: impl Into<SourceDef>,
    ) -> crate::Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::Style("source id must not be empty".to_string()));
        }
        if self.has_source(&id) {
            return Err(crate::Error::Style(format!(
                "source '{}' is already registered",
                id
            )));
        }
        self.sources.push((id, source.into()));
        Ok(())
    }

    /// Appends a layer to the paint order.
    ///
    /// The layer id must be unique, its source must exist, and the layer kind
    /// must match the source kind.
    pub fn add_layer(&mut self, layer: LayerDef) -> crate::Result<()> {
        if layer.id.is_empty() {
            return Err(crate::Error::Style("layer id must not be empty".to_string()));
        }
        if self.has_layer(&layer.id) {
            return Err(crate::Error::Style(format!(
                "layer '{}' is already registered",
                layer.id
            )));
        }
        let source = self.source(&layer.source).ok_or_else(|| {
            crate::Error::Style(format!(
                "layer '{}' references unknown source '{}'",
                layer.id, layer.source
            ))
        })?;
        if !layer.kind.compatible_with(source) {
            return Err(crate::Error::Style(format!(
                "{} layer '{}' cannot draw from {} source '{}'",
                layer.kind,
                layer.id,
                source.kind_name(),
                layer.source
            )));
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.iter().any(|(source_id, _)| source_id == id)
    }

    pub fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    pub fn source(&self, id: &str) -> Option<&SourceDef> {
        self.sources
            .iter()
            .find(|(source_id, _)| source_id == id)
            .map(|(_, source)| source)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerDef> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Source ids in registration order
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(id, _)| id.as_str())
    }

    pub fn sources(&self) -> &[(String, SourceDef)] {
        &self.sources
    }

    /// Layers in paint order (first is drawn at the bottom)
    pub fn layers(&self) -> &[LayerDef] {
        &self.layers
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.id.as_str())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}
