//! Folding fetched tile collections into a band accumulator.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use super::{Feature, FeatureCollection, FeatureId};

/// What to do with features that carry no usable `id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingIdPolicy {
    /// Append every id-less feature; it is never deduplicated.
    #[default]
    AlwaysNew,
    /// Deduplicate id-less features by a SHA-256 digest of their JSON.
    ContentHash,
}

/// Counts produced by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Features appended to the accumulator.
    pub added: usize,
    /// Features skipped because their identity was already merged.
    pub duplicates: usize,
    /// Features appended without any identity.
    pub anonymous: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.added += other.added;
        self.duplicates += other.duplicates;
        self.anonymous += other.anonymous;
    }
}

fn content_digest(feature: &Feature) -> FeatureId {
    let mut hasher = Sha256::new();
    // serde_json maps are key-sorted, so equal features hash equally
    hasher.update(feature.as_value().to_string().as_bytes());
    FeatureId::Digest(format!("{:x}", hasher.finalize()))
}

/// Appends every feature of `incoming` whose identity is not yet in `seen`.
///
/// Features are visited in arrival order. Regardless of the order in which
/// tile collections are merged, the resulting set of identities is the
/// union of all inputs.
pub fn merge_features(
    seen: &mut HashSet<FeatureId>,
    accumulator: &mut FeatureCollection,
    incoming: FeatureCollection,
    policy: MissingIdPolicy,
) -> MergeStats {
    let mut stats = MergeStats::default();

    for feature in incoming {
        let id = match (feature.id(), policy) {
            (Some(id), _) => Some(id),
            (None, MissingIdPolicy::ContentHash) => Some(content_digest(&feature)),
            (None, MissingIdPolicy::AlwaysNew) => None,
        };

        match id {
            Some(id) => {
                if seen.insert(id) {
                    accumulator.push(feature);
                    stats.added += 1;
                } else {
                    stats.duplicates += 1;
                }
            }
            None => {
                accumulator.push(feature);
                stats.added += 1;
                stats.anonymous += 1;
            }
        }
    }

    stats
}
