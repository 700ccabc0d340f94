use crate::core::geo::{LatLng, LatLngBounds, Point, TileCoord, EARTH_RADIUS, MAX_LATITUDE};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Manages the current view of the map: center, zoom, and screen dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
    /// Pixel origin for coordinate transformations (to avoid precision issues)
    pixel_origin: Option<Point>,
    /// Maximum bounds for the map
    max_bounds: Option<LatLngBounds>,
    /// Viscosity for bounds enforcement (0.0 = loose, 1.0 = solid)
    max_bounds_viscosity: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center,
            zoom: zoom.clamp(0.0, 18.0),
            size,
            min_zoom: 0.0,
            max_zoom: 18.0,
            pixel_origin: None,
            max_bounds: None,
            max_bounds_viscosity: 0.0,
        }
    }

    /// Sets the maximum bounds for the map
    pub fn set_max_bounds(&mut self, bounds: Option<LatLngBounds>, viscosity: Option<f64>) {
        self.max_bounds = bounds;
        self.max_bounds_viscosity = viscosity.unwrap_or(0.0).clamp(0.0, 1.0);
        self.center = self.clamp_center(self.center);
        self.update_pixel_origin();
    }

    /// Sets the center of the viewport with bounds checking
    pub fn set_center(&mut self, center: LatLng) {
        self.center = self.clamp_center(center);
        self.update_pixel_origin();
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.update_pixel_origin();
    }

    /// Sets the viewport size
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
        self.update_pixel_origin();
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Gets the scale factor for the current zoom level
    pub fn scale(&self) -> f64 {
        2_f64.powf(self.zoom)
    }

    /// Projects a LatLng to world pixel coordinates at the given zoom level
    /// using the standard Web Mercator projection (EPSG:3857)
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let z = zoom.unwrap_or(self.zoom);
        let scale = 256.0 * 2_f64.powf(z);

        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let y = ((PI / 4.0 + lat_lng.lat.to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;

        // Map raw Mercator meters onto the world pixel square at this zoom
        let pixel_x = (x + PI * EARTH_RADIUS) / (2.0 * PI * EARTH_RADIUS) * scale;
        let pixel_y = (-y + PI * EARTH_RADIUS) / (2.0 * PI * EARTH_RADIUS) * scale;

        Point::new(pixel_x, pixel_y)
    }

    /// Unprojects world pixel coordinates back to LatLng at the given zoom level
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let z = zoom.unwrap_or(self.zoom);
        let scale = 256.0 * 2_f64.powf(z);

        let x = (pixel.x / scale) * (2.0 * PI * EARTH_RADIUS) - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - (pixel.y / scale) * (2.0 * PI * EARTH_RADIUS);

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();

        LatLng::new(lat, lng)
    }

    /// Gets or calculates the pixel origin for this viewport
    pub fn get_pixel_origin(&self) -> Point {
        self.pixel_origin
            .unwrap_or_else(|| self.project(&self.center, None).floor())
    }

    /// Updates the pixel origin based on current center
    fn update_pixel_origin(&mut self) {
        self.pixel_origin = Some(self.project(&self.center, None).floor());
    }

    /// Converts a geographical coordinate to screen pixel coordinates (container relative)
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        let layer_point = self.lat_lng_to_layer_point(lat_lng);
        self.layer_point_to_container_point(&layer_point)
    }

    /// Converts screen pixel coordinates back to geographical coordinates
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let layer_point = self.container_point_to_layer_point(pixel);
        self.layer_point_to_lat_lng(&layer_point)
    }

    /// Converts LatLng to layer point (relative to pixel origin)
    pub fn lat_lng_to_layer_point(&self, lat_lng: &LatLng) -> Point {
        let projected_point = self.project(lat_lng, None);
        projected_point.subtract(&self.get_pixel_origin())
    }

    /// Converts layer point back to LatLng
    pub fn layer_point_to_lat_lng(&self, point: &Point) -> LatLng {
        let projected_point = point.add(&self.get_pixel_origin());
        self.unproject(&projected_point, None)
    }

    /// Converts layer point to container point (screen coordinates)
    pub fn layer_point_to_container_point(&self, point: &Point) -> Point {
        Point::new(point.x + self.size.x / 2.0, point.y + self.size.y / 2.0)
    }

    /// Converts container point to layer point
    pub fn container_point_to_layer_point(&self, point: &Point) -> Point {
        Point::new(point.x - self.size.x / 2.0, point.y - self.size.y / 2.0)
    }

    /// Pans the viewport by the given pixel offset with bounds checking
    pub fn pan(&mut self, delta: Point) -> Point {
        let current_layer_point = self.lat_lng_to_layer_point(&self.center);
        let mut new_layer_point = current_layer_point.subtract(&delta);

        if let Some(bounds) = &self.max_bounds {
            if self.max_bounds_viscosity > 0.0 {
                new_layer_point = self.limit_offset_to_bounds(new_layer_point, bounds);
            }
        }

        let new_center = self.layer_point_to_lat_lng(&new_layer_point);
        self.set_center(new_center);

        // Return the actual delta that was applied (may be limited by bounds)
        let actual_new_layer_point = self.lat_lng_to_layer_point(&self.center);
        actual_new_layer_point.subtract(&current_layer_point)
    }

    /// Limits an offset to stay within bounds (viscous bounds)
    fn limit_offset_to_bounds(&self, layer_point: Point, bounds: &LatLngBounds) -> Point {
        let nw =
            self.lat_lng_to_layer_point(&LatLng::new(bounds.north_east.lat, bounds.south_west.lng));
        let se =
            self.lat_lng_to_layer_point(&LatLng::new(bounds.south_west.lat, bounds.north_east.lng));

        let limit_min = Point::new(nw.x, nw.y);
        let limit_max = Point::new(se.x - self.size.x, se.y - self.size.y);

        let mut limited_point = layer_point;

        if layer_point.x < limit_min.x {
            limited_point.x = self.viscous_limit(layer_point.x, limit_min.x);
        }
        if layer_point.y < limit_min.y {
            limited_point.y = self.viscous_limit(layer_point.y, limit_min.y);
        }
        if layer_point.x > limit_max.x {
            limited_point.x = self.viscous_limit(layer_point.x, limit_max.x);
        }
        if layer_point.y > limit_max.y {
            limited_point.y = self.viscous_limit(layer_point.y, limit_max.y);
        }

        limited_point
    }

    /// Applies viscous resistance to boundary violations
    fn viscous_limit(&self, value: f64, threshold: f64) -> f64 {
        value - (value - threshold) * self.max_bounds_viscosity
    }

    /// Zooms the viewport to a specific level at a given point
    pub fn zoom_to(&mut self, zoom: f64, focus_point: Option<Point>) {
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let old_zoom = self.zoom;

        // No-op if zoom does not change significantly
        if (new_zoom - old_zoom).abs() < 0.001 {
            return;
        }

        if let Some(focus_screen) = focus_point {
            // Keep the geographical point under the cursor stationary
            let focus_latlng = self.pixel_to_lat_lng(&focus_screen);

            self.zoom = new_zoom;
            self.update_pixel_origin();

            let new_focus_screen = self.lat_lng_to_pixel(&focus_latlng);
            let offset = new_focus_screen.subtract(&focus_screen);

            self.pan(offset);
        } else {
            self.zoom = new_zoom;
            self.update_pixel_origin();
        }
    }

    /// Gets the current viewport bounds in geographical coordinates
    pub fn bounds(&self) -> LatLngBounds {
        let nw_pixel = Point::new(0.0, 0.0);
        let se_pixel = Point::new(self.size.x, self.size.y);

        let nw = self.pixel_to_lat_lng(&nw_pixel);
        let se = self.pixel_to_lat_lng(&se_pixel);

        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }

    /// Enumerates the tile coordinates covering the viewport at the given tile zoom.
    ///
    /// The tile zoom may differ from the viewport zoom when a source clamps
    /// its zoom range, in which case tiles are stretched at draw time.
    pub fn visible_tiles(&self, zoom: u8) -> Vec<TileCoord> {
        let nw = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let se = self.pixel_to_lat_lng(&Point::new(self.size.x, self.size.y));

        let max_index = 2_u32.pow(zoom as u32).saturating_sub(1);
        let min_tile = TileCoord::from_lat_lng(&nw, zoom);
        let max_tile = TileCoord::from_lat_lng(&se, zoom);

        let min_x = min_tile.x.min(max_index);
        let max_x = max_tile.x.min(max_index);
        let min_y = min_tile.y.min(max_index);
        let max_y = max_tile.y.min(max_index);

        let mut tiles = Vec::with_capacity(
            ((max_x - min_x + 1) * (max_y - min_y + 1)) as usize,
        );
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                tiles.push(TileCoord::new(x, y, zoom));
            }
        }
        tiles
    }

    /// Clamps center to world bounds or max_bounds if set
    fn clamp_center(&self, center: LatLng) -> LatLng {
        if let Some(bounds) = &self.max_bounds {
            LatLng::new(
                center
                    .lat
                    .clamp(bounds.south_west.lat, bounds.north_east.lat),
                center
                    .lng
                    .clamp(bounds.south_west.lng, bounds.north_east.lng),
            )
        } else {
            LatLng::new(
                center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
                center.lng.clamp(-180.0, 180.0),
            )
        }
    }

    /// Get the maximum bounds for the map if set
    pub fn max_bounds(&self) -> Option<&LatLngBounds> {
        self.max_bounds.as_ref()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0, Point::new(800.0, 600.0))
    }
}
