//! Provider types and traits

use std::future::Future;

use thiserror::Error;

use crate::coord::{BoundingBox, TileCoord};
use crate::feature::FeatureCollection;

/// Errors that can occur while fetching one tile.
///
/// These never abort a reconciliation cycle; the tile simply contributes
/// nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport failure (connection, timeout, body read)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Body is not a feature collection
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One tile to fetch within a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub tile: TileCoord,
    /// Geographic bounds of `tile`, sent as the `bbox` parameter.
    pub bbox: BoundingBox,
    /// Simplification tolerance computed for the cycle. Passed through for
    /// consumers that simplify geometry; unused by the engine.
    pub tolerance: f64,
}

/// Source of features for a tile.
///
/// Implementors turn a [`TileRequest`] into a parsed feature collection.
pub trait FeatureSource: Send + Sync {
    /// Fetches the features intersecting one tile.
    fn fetch_tile(
        &self,
        request: &TileRequest,
    ) -> impl Future<Output = Result<FeatureCollection, ProviderError>> + Send;

    /// Returns the source's name for logging and identification.
    fn name(&self) -> &str;
}
