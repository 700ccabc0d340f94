//! Immediate-mode egui widget that draws a [`MapView`].
//!
//! Each frame the widget queues missing tiles, drains finished downloads,
//! and paints the style's layers in order: raster tiles as textures,
//! GeoJSON as filled polygons, lines and circles. Tile textures are cached
//! in egui's memory so each tile image is decoded once.

use crate::core::geo::{LatLng, Point, TileCoord};
use crate::core::map::MapView;
use crate::data::geojson::{GeoJson, GeoJsonGeometry};
use crate::style::paint::{CirclePaint, Color, FillPaint, LinePaint, RasterPaint};
use crate::style::{LayerKind, SourceDef};
use egui::{Color32, Pos2, Rect, Response, Sense, Shape, Stroke, Ui, Vec2, Widget};

/// Scroll units to zoom levels
const SCROLL_ZOOM_FACTOR: f64 = 0.003;

/// Draws one [`MapView`], filling the available space.
///
/// The caller owns the map; the widget borrows it for the frame. Drag pans,
/// scroll zooms around the cursor.
pub struct MapWidget<'a> {
    map: &'a mut MapView,
    interactive: bool,
}

impl<'a> MapWidget<'a> {
    pub fn new(map: &'a mut MapView) -> Self {
        Self {
            map,
            interactive: true,
        }
    }

    /// Disables pan and zoom input (default: enabled)
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

impl Widget for MapWidget<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let desired_size = ui.available_size();
        let (rect, mut response) = ui.allocate_exact_size(desired_size, Sense::click_and_drag());
        let map = self.map;

        // Keep the viewport in step with the allocated rect
        let size = Point::new(rect.width() as f64, rect.height() as f64);
        let current = map.viewport().size;
        if (current.x - size.x).abs() > 1.0 || (current.y - size.y).abs() > 1.0 {
            map.viewport_mut().set_size(size);
        }

        if !map.is_ready() {
            paint_placeholder(ui, rect);
            return response;
        }

        if self.interactive {
            if response.hovered() {
                let scroll_delta = ui.input(|i| i.raw_scroll_delta.y);
                if scroll_delta.abs() > 0.1 {
                    let focus = response.hover_pos().map(|pos| {
                        Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64)
                    });
                    let target = map.viewport().zoom + scroll_delta as f64 * SCROLL_ZOOM_FACTOR;
                    map.viewport_mut().zoom_to(target, focus);
                    response.mark_changed();
                }
            }

            if response.dragged() {
                let drag_delta = response.drag_delta();
                if drag_delta.length_sq() > 0.5 {
                    map.viewport_mut()
                        .pan(Point::new(drag_delta.x as f64, drag_delta.y as f64));
                    response.mark_changed();
                }
            }
        }

        map.update_tiles();
        if map.poll_results() {
            ui.ctx().request_repaint();
        }

        paint_map(ui, rect, map);

        if map.pending_tiles() > 0 {
            ui.ctx()
                .request_repaint_after(std::time::Duration::from_millis(100));
        }

        response
    }
}

fn paint_placeholder(ui: &Ui, rect: Rect) {
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, Color32::from_rgb(230, 230, 230));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "Loading map...",
        egui::FontId::proportional(16.0),
        Color32::from_gray(100),
    );
}

fn paint_map(ui: &Ui, rect: Rect, map: &MapView) {
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, Color32::from_rgb(230, 230, 230));

    let zoom = map.viewport().zoom;
    let mut painted_tiles = 0;

    for layer in map.style().layers() {
        if !map.layer_visible(&layer.id) {
            continue;
        }
        match &layer.kind {
            LayerKind::Raster(paint) => {
                painted_tiles += paint_raster_layer(ui, &painter, rect, map, &layer.source, paint);
            }
            LayerKind::Fill(paint) => {
                if let Some(doc) = map.geojson(&layer.source) {
                    paint_fill_layer(&painter, rect, map, doc, paint, zoom);
                }
            }
            LayerKind::Line(paint) => {
                if let Some(doc) = map.geojson(&layer.source) {
                    paint_line_layer(&painter, rect, map, doc, paint, zoom);
                }
            }
            LayerKind::Circle(paint) => {
                if let Some(doc) = map.geojson(&layer.source) {
                    paint_circle_layer(&painter, rect, map, doc, paint, zoom);
                }
            }
        }
    }

    paint_attribution(&painter, rect, map);

    #[cfg(feature = "debug")]
    log::debug!(
        "frame: {} tiles painted, {} pending, zoom {:.2}",
        painted_tiles,
        map.pending_tiles(),
        zoom
    );
    let _ = painted_tiles;
}

fn paint_raster_layer(
    ui: &Ui,
    painter: &egui::Painter,
    rect: Rect,
    map: &MapView,
    source_id: &str,
    paint: &RasterPaint,
) -> usize {
    let Some(SourceDef::Raster(raster)) = map.style().source(source_id) else {
        return 0;
    };

    let tint = if paint.opacity >= 1.0 {
        Color32::WHITE
    } else {
        Color32::WHITE.gamma_multiply(paint.opacity.max(0.0) as f32)
    };

    let viewport = map.viewport();
    let zoom = raster.clamp_zoom(viewport.zoom);
    let mut painted = 0;

    for coord in viewport.visible_tiles(zoom) {
        let Some(bytes) = map.cached_tile(source_id, &coord) else {
            continue;
        };
        let Some(texture) = tile_texture(ui.ctx(), source_id, &coord, &bytes) else {
            continue;
        };

        let tile_rect = tile_screen_rect(rect, map, &coord);
        if !rect.intersects(tile_rect) {
            continue;
        }

        painter.image(
            texture.id(),
            tile_rect,
            Rect::from_min_size(Pos2::ZERO, Vec2::splat(1.0)),
            tint,
        );
        painted += 1;
    }

    painted
}

/// Screen rect of a tile, derived from its geographic bounds so tiles from
/// a clamped source zoom stretch correctly over the viewport zoom.
fn tile_screen_rect(rect: Rect, map: &MapView, coord: &TileCoord) -> Rect {
    let bounds = coord.bounds();
    let nw = LatLng::new(bounds.north_east.lat, bounds.south_west.lng);
    let se = LatLng::new(bounds.south_west.lat, bounds.north_east.lng);

    let top_left = map.viewport().lat_lng_to_pixel(&nw);
    let bottom_right = map.viewport().lat_lng_to_pixel(&se);

    Rect::from_two_pos(
        Pos2::new(
            rect.min.x + top_left.x as f32,
            rect.min.y + top_left.y as f32,
        ),
        Pos2::new(
            rect.min.x + bottom_right.x as f32,
            rect.min.y + bottom_right.y as f32,
        ),
    )
}

/// Decodes a tile image into a texture, cached in egui memory per tile
fn tile_texture(
    ctx: &egui::Context,
    source_id: &str,
    coord: &TileCoord,
    bytes: &[u8],
) -> Option<egui::TextureHandle> {
    let id = egui::Id::new(("notomap-tile", source_id, coord.x, coord.y, coord.z));
    if let Some(texture) = ctx.memory(|mem| mem.data.get_temp::<egui::TextureHandle>(id)) {
        return Some(texture);
    }

    let image = image::load_from_memory(bytes).ok()?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(
        [width as usize, height as usize],
        rgba.as_raw(),
    );
    let texture = ctx.load_texture(
        format!("{}/{}/{}/{}", source_id, coord.z, coord.x, coord.y),
        color_image,
        egui::TextureOptions::LINEAR,
    );
    ctx.memory_mut(|mem| mem.data.insert_temp(id, texture.clone()));
    Some(texture)
}

fn layer_color(color: Color, opacity: f64) -> Color32 {
    Color32::from_rgba_unmultiplied(
        color.r,
        color.g,
        color.b,
        (opacity.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

fn project_point(rect: Rect, map: &MapView, coord: &[f64; 2]) -> Pos2 {
    let pixel = map.viewport().lat_lng_to_pixel(&LatLng::new(coord[1], coord[0]));
    Pos2::new(rect.min.x + pixel.x as f32, rect.min.y + pixel.y as f32)
}

fn project_ring(rect: Rect, map: &MapView, ring: &[[f64; 2]]) -> Vec<Pos2> {
    ring.iter()
        .map(|coord| project_point(rect, map, coord))
        .collect()
}

fn paint_fill_layer(
    painter: &egui::Painter,
    rect: Rect,
    map: &MapView,
    doc: &GeoJson,
    paint: &FillPaint,
    zoom: f64,
) {
    let color = layer_color(paint.color, paint.opacity.eval(zoom));
    for feature in doc.features() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        paint_fill_geometry(painter, rect, map, geometry, color);
    }
}

fn paint_fill_geometry(
    painter: &egui::Painter,
    rect: Rect,
    map: &MapView,
    geometry: &GeoJsonGeometry,
    color: Color32,
) {
    match geometry {
        GeoJsonGeometry::Polygon { coordinates } => {
            // Outer ring only; egui tessellates convex outlines, which is
            // close enough for the section shapes
            if let Some(ring) = coordinates.first() {
                let points = project_ring(rect, map, ring);
                if points.len() >= 3 {
                    painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
                }
            }
        }
        GeoJsonGeometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                if let Some(ring) = polygon.first() {
                    let points = project_ring(rect, map, ring);
                    if points.len() >= 3 {
                        painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
                    }
                }
            }
        }
        GeoJsonGeometry::GeometryCollection { geometries } => {
            for geometry in geometries {
                paint_fill_geometry(painter, rect, map, geometry, color);
            }
        }
        _ => {}
    }
}

fn paint_line_layer(
    painter: &egui::Painter,
    rect: Rect,
    map: &MapView,
    doc: &GeoJson,
    paint: &LinePaint,
    zoom: f64,
) {
    let color = layer_color(paint.color, paint.opacity.eval(zoom));
    let stroke = Stroke::new(paint.width as f32, color);
    for feature in doc.features() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        paint_line_geometry(painter, rect, map, geometry, stroke);
    }
}

fn paint_line_geometry(
    painter: &egui::Painter,
    rect: Rect,
    map: &MapView,
    geometry: &GeoJsonGeometry,
    stroke: Stroke,
) {
    match geometry {
        GeoJsonGeometry::LineString { coordinates } => {
            let points = project_ring(rect, map, coordinates);
            if points.len() >= 2 {
                painter.add(Shape::line(points, stroke));
            }
        }
        GeoJsonGeometry::MultiLineString { coordinates } => {
            for line in coordinates {
                let points = project_ring(rect, map, line);
                if points.len() >= 2 {
                    painter.add(Shape::line(points, stroke));
                }
            }
        }
        // Line layers over polygon sources outline every ring
        GeoJsonGeometry::Polygon { coordinates } => {
            for ring in coordinates {
                let points = project_ring(rect, map, ring);
                if points.len() >= 2 {
                    painter.add(Shape::line(points, stroke));
                }
            }
        }
        GeoJsonGeometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                for ring in polygon {
                    let points = project_ring(rect, map, ring);
                    if points.len() >= 2 {
                        painter.add(Shape::line(points, stroke));
                    }
                }
            }
        }
        GeoJsonGeometry::GeometryCollection { geometries } => {
            for geometry in geometries {
                paint_line_geometry(painter, rect, map, geometry, stroke);
            }
        }
        _ => {}
    }
}

fn paint_circle_layer(
    painter: &egui::Painter,
    rect: Rect,
    map: &MapView,
    doc: &GeoJson,
    paint: &CirclePaint,
    zoom: f64,
) {
    let color = layer_color(paint.color, paint.opacity.eval(zoom));
    let radius = paint.radius.eval(zoom).max(0.0) as f32;
    for point in doc.point_coordinates() {
        let pixel = map.viewport().lat_lng_to_pixel(&point);
        let pos = Pos2::new(rect.min.x + pixel.x as f32, rect.min.y + pixel.y as f32);
        if rect.expand(radius).contains(pos) {
            painter.circle_filled(pos, radius, color);
        }
    }
}

/// Attribution notices of visible raster layers, bottom right
fn paint_attribution(painter: &egui::Painter, rect: Rect, map: &MapView) {
    let mut notices: Vec<&str> = Vec::new();
    for (id, source) in map.style().sources() {
        let SourceDef::Raster(raster) = source else {
            continue;
        };
        let Some(attribution) = raster.attribution.as_deref() else {
            continue;
        };
        let drawn = map
            .style()
            .layers()
            .iter()
            .any(|layer| layer.source == *id && map.layer_visible(&layer.id));
        if drawn && !notices.contains(&attribution) {
            notices.push(attribution);
        }
    }
    if notices.is_empty() {
        return;
    }

    painter.text(
        rect.right_bottom() + Vec2::new(-5.0, -5.0),
        egui::Align2::RIGHT_BOTTOM,
        notices.join(" | "),
        egui::FontId::proportional(10.0),
        Color32::from_gray(120),
    );
}
