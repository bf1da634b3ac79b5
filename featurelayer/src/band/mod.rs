//! Zoom band index
//!
//! Continuous map zoom levels are quantized into bands so that small zoom
//! changes reuse already-fetched data. Each band owns the set of tile keys
//! requested for it, the identities of features merged into it, and the
//! merged feature collection itself.
//!
//! All band state lives in a single [`ZoomBandIndex`] owned by one layer.
//! There is no eviction: state grows for the lifetime of the layer and is
//! discarded wholesale by [`ZoomBandIndex::reset_all`].

mod state;

pub use state::BandState;

use std::collections::HashMap;
use std::fmt;

use crate::coord::MAX_ZOOM;

/// Identifier of a zoom band: the tile zoom level data is fetched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoomBand(pub u8);

impl ZoomBand {
    /// Tile zoom level of this band.
    pub fn zoom(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ZoomBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZL{}", self.0)
    }
}

/// How map zoom levels are mapped to bands. Chosen once per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPolicy {
    /// Always fetch at one fixed zoom level.
    Static(u8),
    /// Fetch at the largest even zoom level not above the map zoom.
    Dynamic,
}

impl BandPolicy {
    /// Quantizes a map zoom level into a band.
    pub fn band_for(&self, zoom: f64) -> ZoomBand {
        match self {
            BandPolicy::Static(level) => ZoomBand(*level),
            BandPolicy::Dynamic => {
                let even = 2.0 * (zoom.max(0.0) / 2.0).floor();
                ZoomBand((even as u8).min(MAX_ZOOM))
            }
        }
    }
}

/// Per-band state for one layer.
#[derive(Debug, Default)]
pub struct ZoomBandIndex {
    bands: HashMap<ZoomBand, BandState>,
    generation: u64,
}

impl ZoomBandIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `band`, allocating an empty one on first use.
    pub fn get_or_create(&mut self, band: ZoomBand) -> &mut BandState {
        self.bands.entry(band).or_default()
    }

    /// Returns the state for `band` if it has been created.
    pub fn get(&self, band: ZoomBand) -> Option<&BandState> {
        self.bands.get(&band)
    }

    /// Discards every band.
    ///
    /// The generation counter is bumped so that cycles which marked tiles
    /// before the reset can detect it and drop their results.
    pub fn reset_all(&mut self) {
        self.bands.clear();
        self.generation += 1;
    }

    /// Number of resets performed on this index.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of bands currently allocated.
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Allocated bands in ascending zoom order.
    pub fn bands(&self) -> Vec<(ZoomBand, &BandState)> {
        let mut bands: Vec<_> = self.bands.iter().map(|(band, state)| (*band, state)).collect();
        bands.sort_by_key(|(band, _)| *band);
        bands
    }
}
