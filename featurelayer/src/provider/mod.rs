//! Feature provider abstraction
//!
//! This module turns tiles into requests against a remote feature service
//! and parses the responses.
//!
//! ```ignore
//! use featurelayer::provider::{AsyncReqwestClient, OgcFeaturesProvider};
//!
//! let http_client = AsyncReqwestClient::with_timeout(config.fetch.timeout)?;
//! let provider = OgcFeaturesProvider::new(http_client, config.clone());
//! ```

mod http;
mod ogc;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient};
pub use ogc::OgcFeaturesProvider;
pub use types::{FeatureSource, ProviderError, TileRequest};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
