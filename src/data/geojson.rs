use crate::core::geo::{LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// GeoJSON geometry, tagged by its `type` member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

impl GeoJsonGeometry {
    /// Geographic bounds of this geometry, if it has any coordinates.
    ///
    /// GeoJSON positions are `[lng, lat]`.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        match self {
            GeoJsonGeometry::Point { coordinates } => {
                let point = LatLng::new(coordinates[1], coordinates[0]);
                Some(LatLngBounds::new(point, point))
            }
            GeoJsonGeometry::LineString { coordinates }
            | GeoJsonGeometry::MultiPoint { coordinates } => coords_bounds(coordinates),
            GeoJsonGeometry::Polygon { coordinates }
            | GeoJsonGeometry::MultiLineString { coordinates } => {
                let mut all_coords = Vec::new();
                for ring in coordinates {
                    all_coords.extend(ring);
                }
                coords_bounds(&all_coords)
            }
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                let mut all_coords = Vec::new();
                for polygon in coordinates {
                    for ring in polygon {
                        all_coords.extend(ring);
                    }
                }
                coords_bounds(&all_coords)
            }
            GeoJsonGeometry::GeometryCollection { geometries } => {
                let mut bounds: Option<LatLngBounds> = None;
                for geometry in geometries {
                    if let Some(geometry_bounds) = geometry.bounds() {
                        match bounds.as_mut() {
                            Some(bounds) => {
                                bounds.extend(&geometry_bounds.south_west);
                                bounds.extend(&geometry_bounds.north_east);
                            }
                            None => bounds = Some(geometry_bounds),
                        }
                    }
                }
                bounds
            }
        }
    }
}

fn coords_bounds(coordinates: &[[f64; 2]]) -> Option<LatLngBounds> {
    let first = coordinates.first()?;
    let mut bounds = LatLngBounds::new(
        LatLng::new(first[1], first[0]),
        LatLng::new(first[1], first[0]),
    );
    for coord in coordinates.iter().skip(1) {
        bounds.extend(&LatLng::new(coord[1], coord[0]));
    }
    Some(bounds)
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, serde_json::Value>>,
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        features: Vec<GeoJsonFeature>,
    },
    Geometry(GeoJsonGeometry),
}

impl GeoJson {
    /// Parses a GeoJSON document from its JSON text
    pub fn from_str(geojson_str: &str) -> crate::Result<Self> {
        serde_json::from_str(geojson_str)
            .map_err(|e| crate::Error::ParseError(format!("Invalid GeoJSON: {}", e)))
    }

    /// Builds an empty FeatureCollection
    pub fn empty_collection() -> Self {
        GeoJson::FeatureCollection {
            name: None,
            features: Vec::new(),
        }
    }

    /// All features in the document, in order
    pub fn features(&self) -> Vec<&GeoJsonFeature> {
        match self {
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::FeatureCollection { features, .. } => features.iter().collect(),
            GeoJson::Geometry(_) => Vec::new(),
        }
    }

    pub fn feature_count(&self) -> usize {
        match self {
            GeoJson::Feature(_) => 1,
            GeoJson::FeatureCollection { features, .. } => features.len(),
            GeoJson::Geometry(_) => 0,
        }
    }

    /// Coordinates of all point-typed features (`Point` and `MultiPoint`).
    ///
    /// Circle layers draw exactly these, matching the `$type == Point`
    /// filter semantics of the web map stack this mirrors.
    pub fn point_coordinates(&self) -> Vec<LatLng> {
        let mut points = Vec::new();
        for feature in self.features() {
            match &feature.geometry {
                Some(GeoJsonGeometry::Point { coordinates }) => {
                    points.push(LatLng::new(coordinates[1], coordinates[0]));
                }
                Some(GeoJsonGeometry::MultiPoint { coordinates }) => {
                    for coord in coordinates {
                        points.push(LatLng::new(coord[1], coord[0]));
                    }
                }
                _ => {}
            }
        }
        points
    }

    /// Bounding box over every feature with coordinates
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut bounds: Option<LatLngBounds> = None;
        for feature in self.features() {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            if let Some(geometry_bounds) = geometry.bounds() {
                match bounds.as_mut() {
                    Some(bounds) => {
                        bounds.extend(&geometry_bounds.south_west);
                        bounds.extend(&geometry_bounds.north_east);
                    }
                    None => bounds = Some(geometry_bounds),
                }
            }
        }
        bounds
    }
}
