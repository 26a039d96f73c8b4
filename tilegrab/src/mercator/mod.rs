//! Spherical Mercator projection algebra.
//!
//! Deterministic conversions between geographic coordinates (WGS84 lat/lng),
//! projected meters (EPSG:3857-equivalent), pixel coordinates at a zoom
//! level, and tile addresses in TMS, Google and QuadKey conventions.
//!
//! All functions are pure and stateless. Callers are expected to validate
//! coordinate ranges beforehand (see [`crate::geo::GeoPoint`]); the math here
//! neither clamps nor checks, matching the behaviour of the classic
//! `GlobalMercator` pyramid used by tile providers.

use std::f64::consts::PI;

use thiserror::Error;

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 512;

/// Spherical earth radius in meters (WGS84 semi-major axis).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Meters per pixel at zoom 0, measured at the equator.
pub const INITIAL_RESOLUTION: f64 = 2.0 * PI * EARTH_RADIUS / TILE_SIZE as f64;

/// Half the projected extent of the earth, in meters.
///
/// The projection origin sits at the SW corner of the extent, so meter
/// coordinates are shifted by this amount to obtain pixel coordinates.
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;

/// Errors from tile-address decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MercatorError {
    /// QuadKey contains a character outside `0..=3`.
    #[error("invalid quadkey digit {digit:?} at position {position}")]
    InvalidQuadKeyDigit { digit: char, position: usize },
}

/// A point in projected (spherical Mercator) meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorMeters {
    pub mx: f64,
    pub my: f64,
}

/// A pixel coordinate within the tile pyramid at a specific zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCoord {
    pub px: f64,
    pub py: f64,
}

/// A tile address in TMS convention (origin bottom-left).
///
/// Indices are signed: the origin pixel of the extent maps to tile -1 under
/// the `ceil(p / TILE_SIZE) - 1` containment rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub tx: i32,
    pub ty: i32,
    pub zoom: u8,
}

/// Bounds of a tile in projected meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

/// Converts WGS84 lat/lng to spherical Mercator meters.
#[inline]
pub fn coords_to_meters(lat: f64, lng: f64) -> MercatorMeters {
    let mx = lng * ORIGIN_SHIFT / 180.0;
    let my = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    MercatorMeters {
        mx,
        my: my * ORIGIN_SHIFT / 180.0,
    }
}

/// Converts spherical Mercator meters back to WGS84 lat/lng.
///
/// Exact inverse of [`coords_to_meters`] up to floating precision.
#[inline]
pub fn meters_to_coords(mx: f64, my: f64) -> (f64, f64) {
    let lng = mx / ORIGIN_SHIFT * 180.0;
    let lat = my / ORIGIN_SHIFT * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lat, lng)
}

/// Resolution in meters per pixel at the given zoom, measured at the equator.
///
/// Fractional zoom levels are allowed (used for framing the rendered map).
#[inline]
pub fn resolution(zoom: f64) -> f64 {
    INITIAL_RESOLUTION / 2.0_f64.powf(zoom)
}

/// Converts projected meters to pixel coordinates at the given zoom level.
#[inline]
pub fn meters_to_pixels(mx: f64, my: f64, zoom: u8) -> PixelCoord {
    let res = resolution(zoom as f64);
    PixelCoord {
        px: (mx + ORIGIN_SHIFT) / res,
        py: (my + ORIGIN_SHIFT) / res,
    }
}

/// Converts pixel coordinates at the given zoom level back to meters.
///
/// Exact inverse of [`meters_to_pixels`].
#[inline]
pub fn pixels_to_meters(px: f64, py: f64, zoom: u8) -> MercatorMeters {
    let res = resolution(zoom as f64);
    MercatorMeters {
        mx: px * res - ORIGIN_SHIFT,
        my: py * res - ORIGIN_SHIFT,
    }
}

/// Returns the tile containing the given pixel coordinate.
///
/// Tile boundaries follow the `ceil(p / TILE_SIZE) - 1` rule, so a pixel
/// exactly on a tile edge belongs to the tile below/left of the edge.
/// The caller carries the zoom level.
#[inline]
pub fn pixels_to_tile(px: f64, py: f64) -> (i32, i32) {
    let tx = (px / TILE_SIZE as f64).ceil() as i32 - 1;
    let ty = (py / TILE_SIZE as f64).ceil() as i32 - 1;
    (tx, ty)
}

/// Converts WGS84 lat/lng directly to a TMS tile address.
#[inline]
pub fn coords_to_tile(lat: f64, lng: f64, zoom: u8) -> TileAddress {
    let meters = coords_to_meters(lat, lng);
    meters_to_tile(meters.mx, meters.my, zoom)
}

/// Converts projected meters to a TMS tile address.
#[inline]
pub fn meters_to_tile(mx: f64, my: f64, zoom: u8) -> TileAddress {
    let pixels = meters_to_pixels(mx, my, zoom);
    let (tx, ty) = pixels_to_tile(pixels.px, pixels.py);
    TileAddress { tx, ty, zoom }
}

/// Moves the origin of a pixel coordinate to the top-left corner of the map.
#[inline]
pub fn pixels_to_raster(px: f64, py: f64, zoom: u8) -> (f64, f64) {
    let map_size = ((TILE_SIZE as u64) << zoom) as f64;
    (px, map_size - py)
}

/// Returns the bounds of the given TMS tile in projected meters.
pub fn tile_bounds(tx: i32, ty: i32, zoom: u8) -> TileBounds {
    let min = pixels_to_meters(
        tx as f64 * TILE_SIZE as f64,
        ty as f64 * TILE_SIZE as f64,
        zoom,
    );
    let max = pixels_to_meters(
        (tx + 1) as f64 * TILE_SIZE as f64,
        (ty + 1) as f64 * TILE_SIZE as f64,
        zoom,
    );
    TileBounds {
        minx: min.mx,
        miny: min.my,
        maxx: max.mx,
        maxy: max.my,
    }
}

/// Converts a TMS tile address to the Google/Slippy-map convention.
///
/// Only the vertical origin differs: `ty` is flipped from bottom-left to
/// top-left of the extent.
#[inline]
pub fn google_tile(tx: i32, ty: i32, zoom: u8) -> TileAddress {
    TileAddress {
        tx,
        ty: (1_i32 << zoom) - 1 - ty,
        zoom,
    }
}

/// Encodes a TMS tile address as a Microsoft QuadKey.
///
/// The key has one base-4 digit per zoom level, most significant first,
/// with bit 0 from `tx` and bit 1 from the flipped `ty`. Zoom 0 yields the
/// empty string (the degenerate single-tile pyramid root).
pub fn quadkey(tx: i32, ty: i32, zoom: u8) -> String {
    let ty = (1_i32 << zoom) - 1 - ty;
    let mut key = String::with_capacity(zoom as usize);
    for i in (1..=zoom).rev() {
        let mask = 1_i32 << (i - 1);
        let mut digit = 0_u8;
        if tx & mask != 0 {
            digit += 1;
        }
        if ty & mask != 0 {
            digit += 2;
        }
        key.push(char::from(b'0' + digit));
    }
    key
}

/// Decodes a QuadKey back to a TMS tile address.
///
/// The zoom level equals the key length; an empty key decodes to the
/// zoom-0 root tile.
pub fn quadkey_to_tile(key: &str) -> Result<TileAddress, MercatorError> {
    let zoom = key.len() as u8;
    let mut tx = 0_i32;
    let mut ty = 0_i32;

    for (position, digit) in key.chars().enumerate() {
        let mask = 1_i32 << (zoom as usize - position - 1);
        match digit {
            '0' => {}
            '1' => tx |= mask,
            '2' => ty |= mask,
            '3' => {
                tx |= mask;
                ty |= mask;
            }
            other => {
                return Err(MercatorError::InvalidQuadKeyDigit {
                    digit: other,
                    position,
                })
            }
        }
    }

    Ok(TileAddress {
        tx,
        ty: (1_i32 << zoom) - 1 - ty,
        zoom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_resolution() {
        // 2π · 6378137 / 512
        assert!((INITIAL_RESOLUTION - 78_271.516_964_020_54).abs() < 1e-6);
    }

    #[test]
    fn test_resolution_halves_per_zoom() {
        for zoom in 0..20 {
            let ratio = resolution(zoom as f64) / resolution(zoom as f64 + 1.0);
            assert!((ratio - 2.0).abs() < 1e-12, "zoom {}", zoom);
        }
    }

    #[test]
    fn test_resolution_fractional_zoom() {
        let r = resolution(12.9);
        assert!(r < resolution(12.0));
        assert!(r > resolution(13.0));
    }

    #[test]
    fn test_coords_to_meters_origin() {
        let m = coords_to_meters(0.0, 0.0);
        assert!(m.mx.abs() < 1e-9);
        assert!(m.my.abs() < 1e-9);
    }

    #[test]
    fn test_coords_to_meters_known_point() {
        // Paris. The easting is lng scaled linearly onto the extent; the
        // northing is checked against the reference pyramid to ~1km.
        let m = coords_to_meters(48.8566, 2.3522);
        assert!((m.mx - 261_845.706).abs() < 0.01, "mx = {}", m.mx);
        assert!((m.my - 6_250_600.0).abs() < 1_000.0, "my = {}", m.my);
    }

    #[test]
    fn test_meters_to_coords_inverse() {
        let (lat, lng) = (40.7128, -74.0060);
        let m = coords_to_meters(lat, lng);
        let (lat2, lng2) = meters_to_coords(m.mx, m.my);
        assert!((lat - lat2).abs() < 1e-9);
        assert!((lng - lng2).abs() < 1e-9);
    }

    #[test]
    fn test_pixels_meters_round_trip() {
        let m = coords_to_meters(51.5074, -0.1278);
        for zoom in [1_u8, 5, 10, 15, 20] {
            let p = meters_to_pixels(m.mx, m.my, zoom);
            let back = pixels_to_meters(p.px, p.py, zoom);
            assert!((back.mx - m.mx).abs() < 1e-6, "zoom {}", zoom);
            assert!((back.my - m.my).abs() < 1e-6, "zoom {}", zoom);
        }
    }

    #[test]
    fn test_pixels_to_tile_boundaries() {
        // A pixel exactly on a tile edge belongs to the lower tile.
        assert_eq!(pixels_to_tile(512.0, 512.0), (0, 0));
        assert_eq!(pixels_to_tile(512.5, 512.5), (1, 1));
        assert_eq!(pixels_to_tile(1024.0, 512.0), (1, 0));
        // The extent origin maps to -1 under the ceil rule.
        assert_eq!(pixels_to_tile(0.0, 0.0), (-1, -1));
    }

    #[test]
    fn test_coords_to_tile_equator_zoom_one() {
        // At zoom 1 the world is 2×2 tiles of 512px; (0,0) sits on the
        // shared corner and lands in the SW tile.
        let tile = coords_to_tile(0.0, 0.0, 1);
        assert_eq!(tile, TileAddress { tx: 0, ty: 0, zoom: 1 });
    }

    #[test]
    fn test_coords_to_tile_northeast_quadrant() {
        let tile = coords_to_tile(45.0, 90.0, 1);
        assert_eq!(tile.tx, 1);
        assert_eq!(tile.ty, 1);
    }

    #[test]
    fn test_tile_bounds_cover_origin_tile() {
        let b = tile_bounds(0, 0, 1);
        assert!((b.minx + ORIGIN_SHIFT).abs() < 1e-6);
        assert!((b.miny + ORIGIN_SHIFT).abs() < 1e-6);
        assert!(b.maxx.abs() < 1e-6);
        assert!(b.maxy.abs() < 1e-6);
    }

    #[test]
    fn test_tile_bounds_adjacent_tiles_share_edge() {
        let left = tile_bounds(3, 4, 6);
        let right = tile_bounds(4, 4, 6);
        assert!((left.maxx - right.minx).abs() < 1e-9);
    }

    #[test]
    fn test_google_tile_flips_vertical_origin() {
        assert_eq!(google_tile(0, 0, 1).ty, 1);
        assert_eq!(google_tile(0, 1, 1).ty, 0);
        assert_eq!(google_tile(5, 2, 3).tx, 5);
        // Flipping twice is the identity.
        let g = google_tile(11, 22, 6);
        assert_eq!(google_tile(g.tx, g.ty, 6).ty, 22);
    }

    #[test]
    fn test_quadkey_length_equals_zoom() {
        for zoom in 0..=23 {
            assert_eq!(quadkey(0, 0, zoom).len(), zoom as usize);
        }
    }

    #[test]
    fn test_quadkey_zoom_zero_is_empty() {
        assert_eq!(quadkey(0, 0, 0), "");
        let root = quadkey_to_tile("").unwrap();
        assert_eq!(root, TileAddress { tx: 0, ty: 0, zoom: 0 });
    }

    #[test]
    fn test_quadkey_single_level() {
        // TMS (0,0) at zoom 1 is the bottom-left tile; flipped ty is 1,
        // so the digit carries only the y bit.
        assert_eq!(quadkey(0, 0, 1), "2");
        assert_eq!(quadkey(1, 1, 1), "1");
        assert_eq!(quadkey(0, 1, 1), "0");
        assert_eq!(quadkey(1, 0, 1), "3");
    }

    #[test]
    fn test_quadkey_round_trip_fixed() {
        for (tx, ty, zoom) in [(0, 0, 1), (3, 5, 3), (100, 200, 12), (8_191, 0, 13)] {
            let key = quadkey(tx, ty, zoom);
            let tile = quadkey_to_tile(&key).unwrap();
            assert_eq!(tile, TileAddress { tx, ty, zoom }, "key {}", key);
        }
    }

    #[test]
    fn test_quadkey_to_tile_rejects_bad_digit() {
        let result = quadkey_to_tile("0124");
        assert_eq!(
            result,
            Err(MercatorError::InvalidQuadKeyDigit {
                digit: '4',
                position: 3
            })
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_projection_round_trip(
                lat in -85.0..85.0_f64,
                lng in -180.0..180.0_f64
            ) {
                let m = coords_to_meters(lat, lng);
                let (lat2, lng2) = meters_to_coords(m.mx, m.my);

                // Relative tolerance of 1e-9, absolute near zero.
                prop_assert!(
                    (lat2 - lat).abs() <= 1e-9 * lat.abs().max(1.0),
                    "lat {} -> {}", lat, lat2
                );
                prop_assert!(
                    (lng2 - lng).abs() <= 1e-9 * lng.abs().max(1.0),
                    "lng {} -> {}", lng, lng2
                );
            }

            #[test]
            fn test_pixel_round_trip(
                lat in -85.0..85.0_f64,
                lng in -180.0..180.0_f64,
                zoom in 0u8..=20
            ) {
                let m = coords_to_meters(lat, lng);
                let p = meters_to_pixels(m.mx, m.my, zoom);
                let back = pixels_to_meters(p.px, p.py, zoom);

                // Tolerance scales with resolution: one millionth of a pixel.
                let tol = resolution(zoom as f64) * 1e-6;
                prop_assert!((back.mx - m.mx).abs() <= tol);
                prop_assert!((back.my - m.my).abs() <= tol);
            }

            #[test]
            fn test_quadkey_round_trip(
                raw_tx in 0u32..1_048_576,
                raw_ty in 0u32..1_048_576,
                zoom in 1u8..=20
            ) {
                let max = 1u32 << zoom;
                let tx = (raw_tx % max) as i32;
                let ty = (raw_ty % max) as i32;

                let key = quadkey(tx, ty, zoom);
                prop_assert_eq!(key.len(), zoom as usize);

                let tile = quadkey_to_tile(&key)?;
                prop_assert_eq!(tile, TileAddress { tx, ty, zoom });
            }

            #[test]
            fn test_google_tile_involution(
                raw_tx in 0u32..1_048_576,
                raw_ty in 0u32..1_048_576,
                zoom in 1u8..=20
            ) {
                let max = 1u32 << zoom;
                let tx = (raw_tx % max) as i32;
                let ty = (raw_ty % max) as i32;

                let g = google_tile(tx, ty, zoom);
                let back = google_tile(g.tx, g.ty, zoom);
                prop_assert_eq!(back, TileAddress { tx, ty, zoom });
            }

            #[test]
            fn test_tile_bounds_are_ordered(
                tx in 0i32..1000,
                ty in 0i32..1000,
                zoom in 10u8..=20
            ) {
                let b = tile_bounds(tx, ty, zoom);
                prop_assert!(b.minx < b.maxx);
                prop_assert!(b.miny < b.maxy);

                // Each tile spans TILE_SIZE pixels worth of meters.
                let span = resolution(zoom as f64) * TILE_SIZE as f64;
                prop_assert!((b.maxx - b.minx - span).abs() < 1e-6);
            }

            #[test]
            fn test_coords_to_tile_in_pyramid_range(
                lat in -85.0..85.0_f64,
                lng in -179.99..180.0_f64,
                zoom in 1u8..=20
            ) {
                let tile = coords_to_tile(lat, lng, zoom);
                let max = 1i32 << zoom;
                prop_assert!(tile.tx >= -1 && tile.tx < max);
                prop_assert!(tile.ty >= -1 && tile.ty < max);
            }
        }
    }
}
