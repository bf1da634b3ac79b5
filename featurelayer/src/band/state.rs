//! State held for a single zoom band.

use std::collections::HashSet;

use crate::coord::TileCoord;
use crate::feature::{merge_features, FeatureCollection, FeatureId, MergeStats, MissingIdPolicy};

/// Requested tiles, merged feature identities and the merged collection
/// for one zoom band.
///
/// Every identity in the accumulator is in `seen_feature_ids` and no
/// identity appears twice in the accumulator.
#[derive(Debug, Default)]
pub struct BandState {
    requested_tiles: HashSet<String>,
    seen_feature_ids: HashSet<FeatureId>,
    accumulator: FeatureCollection,
}

impl BandState {
    /// Records `tile` as requested.
    ///
    /// Returns `false` if the tile was already requested for this band.
    pub fn mark_requested(&mut self, tile: &TileCoord) -> bool {
        self.requested_tiles.insert(tile.quadkey())
    }

    /// Forgets that `tile` was requested so a later cycle fetches it again.
    pub fn release(&mut self, tile: &TileCoord) -> bool {
        self.requested_tiles.remove(&tile.quadkey())
    }

    /// Returns true if `tile` has been requested for this band.
    pub fn is_requested(&self, tile: &TileCoord) -> bool {
        self.requested_tiles.contains(&tile.quadkey())
    }

    /// Number of tiles requested for this band.
    pub fn requested_count(&self) -> usize {
        self.requested_tiles.len()
    }

    /// Returns true if a feature with this identity has been merged.
    pub fn has_seen(&self, id: &FeatureId) -> bool {
        self.seen_feature_ids.contains(id)
    }

    /// Folds a fetched tile's features into the accumulator.
    pub fn merge(&mut self, incoming: FeatureCollection, policy: MissingIdPolicy) -> MergeStats {
        merge_features(
            &mut self.seen_feature_ids,
            &mut self.accumulator,
            incoming,
            policy,
        )
    }

    /// The merged collection for this band.
    pub fn accumulator(&self) -> &FeatureCollection {
        &self.accumulator
    }

    /// Number of features in the accumulator.
    pub fn feature_count(&self) -> usize {
        self.accumulator.len()
    }
}
