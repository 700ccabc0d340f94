//! GeoJSON data model and background fetching.

pub mod geojson;
pub mod loader;

pub use geojson::{GeoJson, GeoJsonFeature, GeoJsonGeometry};
pub use loader::{DataLoader, DataResult};
