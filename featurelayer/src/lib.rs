//! FeatureLayer - Viewport-driven sync of OGC API Features into a map
//!
//! This library keeps a map data source populated with the features of a
//! remote OGC API Features collection that intersect the visible area. The
//! viewport is split into Web Mercator tiles at a quantized zoom band, each
//! tile is requested once per band, and the merged, deduplicated collection
//! is republished to the map after every move.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use featurelayer::config::ServiceConfig;
//! use featurelayer::layer::FeatureLayer;
//! use featurelayer::map::{InMemoryMap, SourceOptions};
//! use featurelayer::provider::{AsyncReqwestClient, OgcFeaturesProvider};
//!
//! let config = ServiceConfig::builder()
//!     .url("https://demo.pygeoapi.io/master")
//!     .collection_id("lakes")
//!     .build()?;
//! let provider = OgcFeaturesProvider::new(AsyncReqwestClient::new()?, config.clone());
//! let (layer, first) =
//!     FeatureLayer::new("lakes", map, config, SourceOptions::new(), provider).await?;
//! ```

pub mod band;
pub mod config;
pub mod coord;
pub mod feature;
pub mod layer;
pub mod logging;
pub mod map;
pub mod provider;

/// Version of the FeatureLayer library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
