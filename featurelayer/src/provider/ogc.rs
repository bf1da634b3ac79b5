//! OGC API Features provider.
//!
//! Requests `{url}/collections/{collectionId}/items` once per tile, limited
//! to the tile's bounding box.

use tracing::{debug, warn};

use super::http::AsyncHttpClient;
use super::types::{FeatureSource, ProviderError, TileRequest};
use crate::config::ServiceConfig;
use crate::coord::BoundingBox;
use crate::feature::FeatureCollection;

/// Fetches tile features from an OGC API Features `items` endpoint.
pub struct OgcFeaturesProvider<C: AsyncHttpClient> {
    http_client: C,
    config: ServiceConfig,
}

impl<C: AsyncHttpClient> OgcFeaturesProvider<C> {
    /// Creates a provider for the collection described by `config`.
    pub fn new(http_client: C, config: ServiceConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Constructs the items URL for a bounding box.
    ///
    /// Parameter order: `limit`, `bbox`, then every forwarded option.
    /// Values are written verbatim.
    pub fn build_url(&self, bbox: &BoundingBox) -> String {
        let mut url = format!(
            "{}/collections/{}/items?limit={}&bbox={}",
            self.config.url.trim_end_matches('/'),
            self.config.collection_id,
            self.config.limit,
            bbox
        );

        for (key, value) in self.config.forwarded_params() {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&value);
        }

        url
    }
}

impl<C: AsyncHttpClient> FeatureSource for OgcFeaturesProvider<C> {
    async fn fetch_tile(&self, request: &TileRequest) -> Result<FeatureCollection, ProviderError> {
        let url = self.build_url(&request.bbox);
        debug!(tile = %request.tile, url = %url, "Fetching tile features");

        let body = self
            .http_client
            .get(&url, &self.config.fetch.headers)
            .await?;

        FeatureCollection::from_slice(&body).map_err(|e| {
            warn!(tile = %request.tile, error = %e, "Tile response is not a feature collection");
            ProviderError::InvalidResponse(e.to_string())
        })
    }

    fn name(&self) -> &str {
        "OGC API Features"
    }
}
