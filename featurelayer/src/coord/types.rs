//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Deepest zoom level a covering tile is resolved to.
pub const MAX_ZOOM: u8 = 28;

/// Tile coordinates in the Web Mercator / Slippy Map pyramid.
///
/// Tile `(0, 0, 0)` covers the whole world; each zoom step splits a tile
/// into four children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level (0-28)
    pub zoom: u8,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(row: u32, col: u32, zoom: u8) -> Self {
        Self { row, col, zoom }
    }

    /// Encodes this tile as a quadkey.
    ///
    /// The quadkey length equals the zoom level, so keys are unique across
    /// zoom levels. The root tile encodes as the empty string.
    pub fn quadkey(&self) -> String {
        let mut key = String::with_capacity(self.zoom as usize);
        for level in (1..=self.zoom).rev() {
            let mask = 1u32 << (level - 1);
            let mut digit = b'0';
            if self.col & mask != 0 {
                digit += 1;
            }
            if self.row & mask != 0 {
                digit += 2;
            }
            key.push(digit as char);
        }
        key
    }

    /// Decodes a quadkey back into tile coordinates.
    pub fn from_quadkey(key: &str) -> Result<Self, CoordError> {
        if key.len() > MAX_ZOOM as usize {
            return Err(CoordError::InvalidQuadkey(key.to_string()));
        }

        let zoom = key.len() as u8;
        let mut row = 0u32;
        let mut col = 0u32;

        for (i, digit) in key.chars().enumerate() {
            let mask = 1u32 << (zoom as usize - i - 1);
            match digit {
                '0' => {}
                '1' => col |= mask,
                '2' => row |= mask,
                '3' => {
                    col |= mask;
                    row |= mask;
                }
                _ => return Err(CoordError::InvalidQuadkey(key.to_string())),
            }
        }

        Ok(Self { row, col, zoom })
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// An axis-aligned geographic rectangle in WGS84 degrees.
///
/// `west <= east` and `south <= north` always hold; a point box is valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Creates a bounding box, rejecting inverted or non-finite bounds.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, CoordError> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(CoordError::NonFinite);
        }
        if west > east || south > north {
            return Err(CoordError::InvertedBounds {
                west,
                south,
                east,
                north,
            });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Builds a box from any two opposite corners given as `(lon, lat)`.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            west: a.0.min(b.0),
            south: a.1.min(b.1),
            east: a.0.max(b.0),
            north: a.1.max(b.1),
        }
    }

    /// The whole Web Mercator world.
    pub fn world() -> Self {
        Self {
            west: MIN_LON,
            south: MIN_LAT,
            east: MAX_LON,
            north: MAX_LAT,
        }
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Returns `[west, south, east, north]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Returns true if `other` lies entirely inside this box (edges included).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.west <= other.west
            && self.south <= other.south
            && self.east >= other.east
            && self.north >= other.north
    }
}

impl fmt::Display for BoundingBox {
    /// Formats as `west,south,east,north`, the OGC `bbox` parameter layout.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl FromStr for BoundingBox {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| CoordError::InvalidBoundingBox(s.to_string()))?;

        match parts.as_slice() {
            [west, south, east, north] => Self::new(*west, *south, *east, *north),
            _ => Err(CoordError::InvalidBoundingBox(s.to_string())),
        }
    }
}

/// Errors that can occur during coordinate handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Bounding box is inverted: west={west}, south={south}, east={east}, north={north}")]
    InvertedBounds {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },

    #[error("Bounding box contains a non-finite value")]
    NonFinite,

    #[error("Invalid bounding box '{0}': expected west,south,east,north")]
    InvalidBoundingBox(String),

    #[error("Invalid quadkey '{0}'")]
    InvalidQuadkey(String),
}
