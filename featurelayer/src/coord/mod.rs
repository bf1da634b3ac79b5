//! Tile math
//!
//! Pure conversions between geographic bounding boxes and Web Mercator
//! tiles: finding the tile that covers a viewport, walking the tile
//! pyramid downwards, and testing rectangles for overlap.

mod types;

pub use types::{BoundingBox, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON};

use std::f64::consts::PI;

/// Resolution used when locating bbox corners before finding their common tile.
const POINT_ZOOM: u32 = 32;

/// Fractional tile position `(col, row)` of a point at the given zoom.
///
/// Latitude is clamped to the Web Mercator range. Longitude wraps around
/// the antimeridian, so `180.0` maps to column 0.
fn point_to_tile_fraction(lon: f64, lat: f64, zoom: u32) -> (f64, f64) {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let sin = (lat * PI / 180.0).sin();
    let n = 2.0_f64.powi(zoom as i32);

    let mut col = n * (lon / 360.0 + 0.5);
    let row = n * (0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI);

    col %= n;
    if col < 0.0 {
        col += n;
    }

    (col, row)
}

/// Integer tile position of a point at [`POINT_ZOOM`].
fn point_to_tile(lon: f64, lat: f64) -> (u64, u64) {
    let max_index = (1u64 << POINT_ZOOM) - 1;
    let (col, row) = point_to_tile_fraction(lon, lat, POINT_ZOOM);
    let col = (col.floor().max(0.0) as u64).min(max_index);
    let row = (row.floor().max(0.0) as u64).min(max_index);
    (col, row)
}

/// Deepest zoom at which two tile positions still share an ancestor.
fn common_zoom(min: (u64, u64), max: (u64, u64)) -> u8 {
    for zoom in 0..MAX_ZOOM {
        let mask = 1u64 << (POINT_ZOOM - (zoom as u32 + 1));
        if (min.0 & mask) != (max.0 & mask) || (min.1 & mask) != (max.1 & mask) {
            return zoom;
        }
    }
    MAX_ZOOM
}

/// Finds the smallest single tile that contains the bbox's diagonal.
///
/// Both corners are located at zoom 32 and the deepest tile whose
/// quadtree prefix they share is returned (capped at [`MAX_ZOOM`]).
pub fn tile_covering(bbox: &BoundingBox) -> TileCoord {
    let min = point_to_tile(bbox.west, bbox.south);
    let max = point_to_tile(bbox.east, bbox.north);

    let zoom = common_zoom(min, max);
    if zoom == 0 {
        return TileCoord::new(0, 0, 0);
    }

    let shift = POINT_ZOOM - zoom as u32;
    TileCoord {
        row: (min.1 >> shift) as u32,
        col: (min.0 >> shift) as u32,
        zoom,
    }
}

/// Returns the four tiles one zoom level deeper that partition `tile`.
///
/// Order: north-west, north-east, south-east, south-west.
#[inline]
pub fn children_of(tile: &TileCoord) -> [TileCoord; 4] {
    let row = tile.row * 2;
    let col = tile.col * 2;
    let zoom = tile.zoom + 1;
    [
        TileCoord::new(row, col, zoom),
        TileCoord::new(row, col + 1, zoom),
        TileCoord::new(row + 1, col + 1, zoom),
        TileCoord::new(row + 1, col, zoom),
    ]
}

/// Expands `tile` breadth-first until every candidate sits at `target_zoom`.
///
/// A tile already at or below the target resolution is returned unchanged.
/// Otherwise `4^(target_zoom - tile.zoom)` tiles are produced.
pub fn descend_to_zoom(tile: &TileCoord, target_zoom: u8) -> Vec<TileCoord> {
    if tile.zoom >= target_zoom {
        return vec![*tile];
    }

    let mut candidates = vec![*tile];
    for _ in tile.zoom..target_zoom {
        candidates = candidates.iter().flat_map(children_of).collect();
    }
    candidates
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Geographic bounds of a tile.
pub fn tile_bbox(tile: &TileCoord) -> BoundingBox {
    let (north, west) = tile_to_lat_lon(tile);
    let (south, east) = tile_to_lat_lon(&TileCoord::new(tile.row + 1, tile.col + 1, tile.zoom));
    BoundingBox {
        west,
        south,
        east,
        north,
    }
}

/// Separating-axis overlap test. Touching edges count as overlap.
#[inline]
pub fn overlaps(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(a.east < b.west || a.west > b.east || a.north < b.south || a.south > b.north)
}

/// Returns true if the tile's bounds overlap `bbox`.
#[inline]
pub fn tile_overlaps(tile: &TileCoord, bbox: &BoundingBox) -> bool {
    overlaps(&tile_bbox(tile), bbox)
}
