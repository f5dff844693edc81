//! Web Mercator projection between geographic, world-pixel, viewport-pixel and tile space.
//!
//! World coordinates are pixels of the full map at a zoom level: the world is
//! `256 * 2^zoom` pixels wide, with the origin at the north-west corner.

use crate::geometry::LatLng;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Edge length of a map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude at which Web Mercator Y becomes infinite.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Clamp a latitude to ±[`MAX_LATITUDE`].
pub fn clamp_latitude(lat: f64) -> f64 {
    lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

/// Wrap a longitude by whole turns until it lies within [-180, 180].
///
/// Values already inside the range are returned untouched, so both boundary meridians survive.
pub fn normalize_longitude(lng: f64) -> f64 {
    if !lng.is_finite() || (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 { 180.0 } else { wrapped }
}

/// Whether a coordinate lies inside the projectable domain.
pub fn within_bounds(p: LatLng) -> bool {
    (-MAX_LATITUDE..=MAX_LATITUDE).contains(&p.lat) && (-180.0..=180.0).contains(&p.lng)
}

/// World size in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project a coordinate to world pixels at `zoom`.
pub fn lat_lng_to_world(p: LatLng, zoom: f64) -> Point {
    let scale = world_size(zoom);
    let lng = normalize_longitude(p.lng);
    let lat_rad = clamp_latitude(p.lat).to_radians();
    let x = (lng + 180.0) / 360.0 * scale;
    let mercator_y = (PI / 4.0 + lat_rad / 2.0).tan().ln();
    let y = (1.0 - mercator_y / PI) / 2.0 * scale;
    Point::new(x, y)
}

/// Inverse of [`lat_lng_to_world`].
pub fn world_to_lat_lng(world: Point, zoom: f64) -> LatLng {
    let scale = world_size(zoom);
    let lng = world.x / scale * 360.0 - 180.0;
    let y_norm = world.y / scale;
    let lat = (PI * (1.0 - 2.0 * y_norm)).sinh().atan().to_degrees();
    LatLng::new(clamp_latitude(lat), normalize_longitude(lng))
}

/// Project `p` into viewport pixels for a viewport centred on `center`.
pub fn lat_lng_to_pixel(p: LatLng, center: LatLng, zoom: f64, viewport: Size) -> Point {
    let world = lat_lng_to_world(p, zoom);
    let center_world = lat_lng_to_world(center, zoom);
    let half = Vec2::new(viewport.width / 2.0, viewport.height / 2.0);
    Point::ZERO + (world - center_world) + half
}

/// Inverse of [`lat_lng_to_pixel`].
pub fn pixel_to_lat_lng(pixel: Point, center: LatLng, zoom: f64, viewport: Size) -> LatLng {
    let center_world = lat_lng_to_world(center, zoom);
    let half = Vec2::new(viewport.width / 2.0, viewport.height / 2.0);
    world_to_lat_lng(center_world + (pixel.to_vec2() - half), zoom)
}

/// Address of a raster tile in the Web Mercator grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

/// Highest tile zoom; tile indices at this level still fit a `u32`.
pub const MAX_TILE_ZOOM: u8 = 32;

/// Tile column or row containing world pixel coordinate `v` at tile zoom `zoom`.
fn tile_coordinate(v: f64, zoom: u8) -> u32 {
    let max = 2f64.powi(zoom as i32) - 1.0;
    (v / TILE_SIZE).floor().clamp(0.0, max) as u32
}

/// Tile containing `p` at an integer zoom level. Zooms above [`MAX_TILE_ZOOM`] are clamped.
pub fn lat_lng_to_tile(p: LatLng, zoom: u8) -> TileIndex {
    let zoom = zoom.min(MAX_TILE_ZOOM);
    let world = lat_lng_to_world(p, zoom as f64);
    TileIndex {
        x: tile_coordinate(world.x, zoom),
        y: tile_coordinate(world.y, zoom),
        zoom,
    }
}

/// North-west corner of tile `(x, y)`.
pub fn tile_to_lat_lng(x: u32, y: u32, zoom: u8) -> LatLng {
    let n = 2f64.powi(zoom as i32);
    let m = PI - 2.0 * PI * y as f64 / n;
    let lat = m.sinh().atan().to_degrees();
    let lng = x as f64 / n * 360.0 - 180.0;
    LatLng::new(lat, lng)
}

/// A map view: centre, zoom and pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub size: Size,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64, size: Size) -> Self {
        Self { center, zoom, size }
    }

    /// World pixel position of the centre.
    pub fn center_world(&self) -> Point {
        lat_lng_to_world(self.center, self.zoom)
    }

    /// Geographic coordinate to viewport pixels.
    pub fn project(&self, p: LatLng) -> Point {
        lat_lng_to_pixel(p, self.center, self.zoom, self.size)
    }

    /// Viewport pixels to geographic coordinate.
    pub fn unproject(&self, pixel: Point) -> LatLng {
        pixel_to_lat_lng(pixel, self.center, self.zoom, self.size)
    }

    /// Whether `pixel` falls on the map rather than beyond its edges.
    pub fn is_on_map(&self, pixel: Point) -> bool {
        let half = Vec2::new(self.size.width / 2.0, self.size.height / 2.0);
        let world = self.center_world() + (pixel.to_vec2() - half);
        let extent = 0.0..=world_size(self.zoom);
        extent.contains(&world.x) && extent.contains(&world.y)
    }

    /// Tiles at `tile_zoom` overlapping the viewport, row by row.
    ///
    /// The range comes from unwrapped world pixels, so a viewport wider than the world yields
    /// every column once.
    pub fn visible_tiles(&self, tile_zoom: u8) -> Vec<TileIndex> {
        let zoom = tile_zoom.min(MAX_TILE_ZOOM);
        let scale = 2f64.powf(zoom as f64 - self.zoom);
        let center = self.center_world();
        let half = Vec2::new(self.size.width / 2.0, self.size.height / 2.0);
        let nw = (center - half).to_vec2() * scale;
        let se = (center + half).to_vec2() * scale;
        let mut tiles = Vec::new();
        for y in tile_coordinate(nw.y, zoom)..=tile_coordinate(se.y, zoom) {
            for x in tile_coordinate(nw.x, zoom)..=tile_coordinate(se.x, zoom) {
                tiles.push(TileIndex { x, y, zoom });
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size::new(800.0, 600.0);

    #[test]
    fn test_world_origin_and_extent() {
        let nw = lat_lng_to_world(LatLng::new(MAX_LATITUDE, -180.0), 0.0);
        assert!(nw.x.abs() < 1e-9);
        assert!(nw.y.abs() < 1e-6);
        let center = lat_lng_to_world(LatLng::new(0.0, 0.0), 1.0);
        assert!((center.x - 256.0).abs() < 1e-9);
        assert!((center.y - 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_pole_clamp() {
        for zoom in [0.0, 3.0, 7.5, 18.0] {
            assert_eq!(
                lat_lng_to_world(LatLng::new(90.0, 0.0), zoom),
                lat_lng_to_world(LatLng::new(MAX_LATITUDE, 0.0), zoom)
            );
            assert_eq!(
                lat_lng_to_world(LatLng::new(-90.0, 0.0), zoom),
                lat_lng_to_world(LatLng::new(-MAX_LATITUDE, 0.0), zoom)
            );
        }
    }

    #[test]
    fn test_pixel_roundtrip() {
        let centers = [
            LatLng::new(0.0, 0.0),
            LatLng::new(52.5, 13.4),
            LatLng::new(-33.9, 151.2),
        ];
        for center in centers {
            for zoom in [0.0, 2.0, 5.5, 12.0] {
                let mut lat = -85.05;
                while lat <= 85.05 {
                    let mut lng = -179.0;
                    while lng <= 180.0 {
                        let p = LatLng::new(lat, lng);
                        let px = lat_lng_to_pixel(p, center, zoom, VIEWPORT);
                        let back = pixel_to_lat_lng(px, center, zoom, VIEWPORT);
                        assert!(back.approx_eq(&p, 1e-6), "{:?} -> {:?}", p, back);
                        lng += 17.3;
                    }
                    lat += 9.45;
                }
            }
        }
    }

    #[test]
    fn test_center_projects_to_viewport_middle() {
        let center = LatLng::new(40.0, -3.7);
        let px = lat_lng_to_pixel(center, center, 6.0, VIEWPORT);
        assert!((px.x - 400.0).abs() < 1e-9);
        assert!((px.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(10.0), 10.0);
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), -180.0);
        assert!((normalize_longitude(190.0) - -170.0).abs() < 1e-9);
        assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert!((normalize_longitude(540.0) - 180.0).abs() < 1e-9);
        assert!((normalize_longitude(725.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_math() {
        assert_eq!(
            lat_lng_to_tile(LatLng::new(0.0, 0.0), 1),
            TileIndex { x: 1, y: 1, zoom: 1 }
        );
        assert_eq!(
            lat_lng_to_tile(LatLng::new(MAX_LATITUDE, 180.0), 3),
            TileIndex { x: 7, y: 0, zoom: 3 }
        );
        let corner = tile_to_lat_lng(0, 0, 0);
        assert!((corner.lat - MAX_LATITUDE).abs() < 1e-6);
        assert_eq!(corner.lng, -180.0);
        let mid = tile_to_lat_lng(1, 1, 1);
        assert!(mid.approx_eq(&LatLng::new(0.0, 0.0), 1e-9));
    }

    #[test]
    fn test_tile_and_pixel_agree() {
        let p = LatLng::new(48.85, 2.35);
        let tile = lat_lng_to_tile(p, 10);
        let world = lat_lng_to_world(p, 10.0);
        assert_eq!(tile.x, (world.x / TILE_SIZE) as u32);
        assert_eq!(tile.y, (world.y / TILE_SIZE) as u32);
        let nw = tile_to_lat_lng(tile.x, tile.y, 10);
        let nw_world = lat_lng_to_world(nw, 10.0);
        assert!((nw_world.x - tile.x as f64 * TILE_SIZE).abs() < 1e-6);
        assert!((nw_world.y - tile.y as f64 * TILE_SIZE).abs() < 1e-6);
    }

    #[test]
    fn test_is_on_map() {
        let vp = Viewport::new(LatLng::new(0.0, 0.0), 0.0, Size::new(512.0, 512.0));
        assert!(vp.is_on_map(Point::new(256.0, 256.0)));
        assert!(vp.is_on_map(Point::new(128.0, 128.0)));
        assert!(!vp.is_on_map(Point::new(100.0, 256.0)));
        assert!(!vp.is_on_map(Point::new(256.0, 400.0)));
    }

    #[test]
    fn test_visible_tiles_cover_viewport() {
        let vp = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Size::new(512.0, 512.0));
        let tiles = vp.visible_tiles(1);
        assert_eq!(tiles.len(), 4);

        let vp = Viewport::new(LatLng::new(0.0, 0.0), 2.0, Size::new(400.0, 300.0));
        let tiles = vp.visible_tiles(2);
        assert_eq!(tiles.first(), Some(&TileIndex { x: 1, y: 1, zoom: 2 }));
        assert_eq!(tiles.last(), Some(&TileIndex { x: 2, y: 2, zoom: 2 }));
        assert_eq!(tiles.len(), 4);
    }

    #[test]
    fn test_visible_tiles_wider_than_world() {
        let vp = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Size::new(1000.0, 1000.0));
        let tiles = vp.visible_tiles(1);
        assert_eq!(tiles.len(), 4);
        assert!(tiles.contains(&TileIndex { x: 0, y: 0, zoom: 1 }));
        assert!(tiles.contains(&TileIndex { x: 1, y: 1, zoom: 1 }));
    }

    #[test]
    fn test_tile_zoom_is_clamped() {
        let tile = lat_lng_to_tile(LatLng::new(0.0, 0.0), 64);
        assert_eq!(tile.zoom, MAX_TILE_ZOOM);
        assert_eq!(tile.x, 1 << 31);
        assert_eq!(tile.y, 1 << 31);
        let corner = lat_lng_to_tile(LatLng::new(-MAX_LATITUDE, 180.0), u8::MAX);
        assert_eq!((corner.x, corner.y), (u32::MAX, u32::MAX));
        assert_eq!(
            Viewport::new(LatLng::new(0.0, 0.0), 3.0, VIEWPORT)
                .visible_tiles(200)
                .first()
                .map(|t| t.zoom),
            Some(MAX_TILE_ZOOM)
        );
    }
}
