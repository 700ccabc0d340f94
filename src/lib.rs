//! # notomap
//!
//! A disaster-map viewer for the Noto Peninsula: a fixed roster of raster
//! tile and GeoJSON sources (base imagery, hazard overlays, shelters)
//! rendered through an egui widget, plus a generative-AI helper that asks
//! Gemini for synthetic damage-report points and splices them into the
//! running map.
//!
//! The crate is split into a small map substrate and two domain modules:
//!
//! - [`core`]: geographic primitives, viewport math and the owned
//!   [`core::map::MapView`] with its two-state lifecycle
//! - [`style`]: validated source and layer definitions in paint order
//! - [`tiles`]: async raster tile fetching with an LRU cache
//! - [`data`]: the GeoJSON model and async document loading
//! - [`bootstrap`]: the fixed Noto Peninsula configuration
//! - [`ai`]: the Gemini client and the overlay generator

pub mod ai;
pub mod bootstrap;
pub mod core;
pub mod data;
pub mod prelude;
pub mod runtime;
pub mod style;
pub mod tiles;

#[cfg(feature = "egui")]
pub mod ui;

// Re-export public API
pub use crate::core::{
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::{Lifecycle, MapView, MapViewOptions},
    viewport::Viewport,
};

pub use crate::style::{LayerDef, LayerKind, SourceDef, Style};

pub use crate::data::geojson::{GeoJson, GeoJsonFeature, GeoJsonGeometry};

pub use crate::ai::overlay::OverlayGenerator;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Style error: {0}")]
    Style(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;
