//! Prelude module for common notomap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use notomap::prelude::*;`

pub use crate::core::{
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::{Lifecycle, MapView, MapViewOptions, SourceData},
    viewport::Viewport,
};

pub use crate::style::{
    layer::{LayerDef, LayerKind},
    paint::{CirclePaint, Color, FillPaint, LinePaint, PaintValue, RasterPaint, ZoomInterpolation},
    source::{GeoJsonData, RasterTiles, SourceDef},
    Style,
};

pub use crate::data::{
    geojson::{GeoJson, GeoJsonFeature, GeoJsonGeometry},
    loader::{DataLoader, DataResult},
};

pub use crate::tiles::{
    cache::TileCache,
    loader::{TileLoader, TileLoaderConfig, TileResult},
    source::{TileSource, TileUrlTemplate},
};

pub use crate::ai::{
    client::{GeminiClient, GeminiConfig},
    overlay::OverlayGenerator,
};

pub use crate::runtime::{
    runtime, spawn, spawn_with_result, AsyncHandle, AsyncHandleWithResult, AsyncSpawner,
};

#[cfg(feature = "egui")]
pub use crate::ui::{controls::LayerControl, widget::MapWidget};

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

#[cfg(feature = "tokio-runtime")]
pub use futures::Future;
