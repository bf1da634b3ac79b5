//! Planning and reporting of a single reconciliation cycle.

use std::fmt;

use crate::band::ZoomBand;
use crate::coord::{children_of, tile_covering, tile_overlaps, BoundingBox, TileCoord};

/// Tiles covering a viewport at a band's zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlan {
    /// Smallest single tile covering the viewport.
    pub primary: TileCoord,
    /// Tiles to request, before filtering out already-requested ones.
    pub candidates: Vec<TileCoord>,
}

/// Determines which tiles cover `viewport` for `band`.
///
/// When the primary tile is coarser than the band it is descended to the
/// band zoom and only descendants overlapping the viewport are kept. When
/// it is already at or finer than the band, the primary tile alone is the
/// plan, even though its bounds extend past the viewport.
///
/// Children are pruned at every level: a tile can only overlap the viewport
/// if its parent does, so the work stays proportional to the viewport.
pub fn plan_tiles(viewport: &BoundingBox, band: ZoomBand) -> TilePlan {
    let primary = tile_covering(viewport);

    let mut candidates = vec![primary];
    for _ in primary.zoom..band.zoom() {
        candidates = candidates
            .iter()
            .flat_map(children_of)
            .filter(|child| tile_overlaps(child, viewport))
            .collect();
    }

    TilePlan {
        primary,
        candidates,
    }
}

/// Simplification tolerance for a viewport: degrees per pixel scaled by
/// the configured factor. Zero without a factor or a zero-width viewport.
pub fn simplify_tolerance(
    viewport: &BoundingBox,
    pixel_width: u32,
    simplify_factor: Option<f64>,
) -> f64 {
    match simplify_factor {
        Some(factor) if pixel_width > 0 => viewport.width().abs() / pixel_width as f64 * factor,
        _ => 0.0,
    }
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The map was zoomed out past the minimum zoom; nothing happened.
    BelowMinZoom { zoom: f64, min_zoom: u8 },
    /// The band's collection was published to the map.
    Published(CycleReport),
    /// The index was reset while tiles were in flight; results were dropped
    /// and nothing was published.
    Superseded(CycleReport),
}

impl CycleOutcome {
    /// The cycle report, unless the cycle was skipped.
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::BelowMinZoom { .. } => None,
            CycleOutcome::Published(report) | CycleOutcome::Superseded(report) => Some(report),
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published(_))
    }
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub band: ZoomBand,
    pub primary: TileCoord,
    /// Number of tiles covering the viewport.
    pub candidates: usize,
    /// Tiles fetched by this cycle.
    pub requested: Vec<TileCoord>,
    /// Requested tiles whose fetch failed.
    pub failed: Vec<TileCoord>,
    /// Features appended to the band accumulator.
    pub features_added: usize,
    /// Features skipped as duplicates.
    pub duplicates: usize,
    /// Size of the published collection.
    pub total_features: usize,
    pub tolerance: f64,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::BelowMinZoom { zoom, min_zoom } => {
                write!(f, "skipped: zoom {:.2} below minimum {}", zoom, min_zoom)
            }
            CycleOutcome::Published(r) => write!(
                f,
                "{}: {} candidate tiles, {} fetched, {} failed, +{} features ({} duplicates), {} total",
                r.band,
                r.candidates,
                r.requested.len(),
                r.failed.len(),
                r.features_added,
                r.duplicates,
                r.total_features
            ),
            CycleOutcome::Superseded(r) => write!(
                f,
                "{}: superseded by reset, {} fetched tiles discarded",
                r.band,
                r.requested.len()
            ),
        }
    }
}
