//! Service configuration
//!
//! [`ServiceConfig`] describes the remote OGC API Features collection a
//! layer synchronizes with. It is built once through [`ServiceConfigBuilder`]
//! and never changes afterwards.
//!
//! [`ConfigFile`] loads the same settings from `~/.featurelayer/config.ini`
//! for the CLI.

mod file;
mod parser;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, LoggingSettings,
    ServiceSettings,
};

use std::time::Duration;

use thiserror::Error;

use crate::band::BandPolicy;
use crate::coord::MAX_ZOOM;
use crate::feature::MissingIdPolicy;

/// Default number of items requested per tile.
pub const DEFAULT_LIMIT: u32 = 5000;

/// Default minimum zoom when fetching at a single static zoom level.
pub const DEFAULT_MIN_ZOOM_STATIC: u8 = 7;

/// Default minimum zoom when bands follow the map zoom.
pub const DEFAULT_MIN_ZOOM_DYNAMIC: u8 = 2;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Option names owned by the engine; never forwarded as query parameters.
pub const RESERVED_KEYS: [&str; 5] = ["limit", "url", "useStaticZoomLevel", "collectionId", "minZoom"];

/// Query parameter carrying the configured simplification factor.
pub const SIMPLIFY_FACTOR_KEY: &str = "simplifyFactor";

/// Configuration errors raised before any state is created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("A source id must be supplied")]
    MissingSourceId,

    #[error("A url must be supplied as part of the service configuration")]
    MissingUrl,

    #[error("A collection id must be supplied as part of the service configuration")]
    MissingCollectionId,

    #[error("Invalid value for {key}: '{value}' - {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Transport options handed to the HTTP client. Opaque to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Extra request headers, sent with every tile request.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Remote collection and fetching behaviour for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// API root, e.g. `https://demo.pygeoapi.io/master`.
    pub url: String,
    /// Collection identifier under `/collections`.
    pub collection_id: String,
    /// Items requested per tile.
    pub limit: u32,
    /// Fetch at `min_zoom` only instead of following the map zoom.
    pub use_static_zoom_level: bool,
    /// Map zoom below which no fetching happens.
    pub min_zoom: u8,
    /// Linear simplification factor forwarded to the service.
    pub simplify_factor: Option<f64>,
    /// Extra query parameters in insertion order.
    pub params: Vec<(String, String)>,
    /// Handling of features without an `id`.
    pub missing_id_policy: MissingIdPolicy,
    /// HTTP transport options.
    pub fetch: FetchOptions,
}

impl ServiceConfig {
    /// Start building a configuration.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Checks the invariants `build()` enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.collection_id.trim().is_empty() {
            return Err(ConfigError::MissingCollectionId);
        }
        if self.limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limit".to_string(),
                value: "0".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        if self.min_zoom > MAX_ZOOM {
            return Err(ConfigError::InvalidValue {
                key: "minZoom".to_string(),
                value: self.min_zoom.to_string(),
                reason: format!("must be between 0 and {}", MAX_ZOOM),
            });
        }
        if let Some(factor) = self.simplify_factor {
            if !factor.is_finite() || factor < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: SIMPLIFY_FACTOR_KEY.to_string(),
                    value: factor.to_string(),
                    reason: "must be a non-negative number".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Zoom band policy implied by `use_static_zoom_level`.
    pub fn band_policy(&self) -> BandPolicy {
        if self.use_static_zoom_level {
            BandPolicy::Static(self.min_zoom)
        } else {
            BandPolicy::Dynamic
        }
    }

    /// Query parameters forwarded verbatim with every request.
    ///
    /// Reserved option names are filtered out here, at request-build time.
    /// The simplification factor is appended unless a parameter of the same
    /// name was supplied explicitly.
    pub fn forwarded_params(&self) -> Vec<(&str, String)> {
        let mut forwarded: Vec<(&str, String)> = self
            .params
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();

        if let Some(factor) = self.simplify_factor {
            if !forwarded.iter().any(|(key, _)| *key == SIMPLIFY_FACTOR_KEY) {
                forwarded.push((SIMPLIFY_FACTOR_KEY, factor.to_string()));
            }
        }

        forwarded
    }
}

/// Fluent builder for [`ServiceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    url: Option<String>,
    collection_id: Option<String>,
    limit: Option<u32>,
    use_static_zoom_level: bool,
    min_zoom: Option<u8>,
    simplify_factor: Option<f64>,
    params: Vec<(String, String)>,
    missing_id_policy: MissingIdPolicy,
    fetch: FetchOptions,
}

impl ServiceConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn collection_id(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn use_static_zoom_level(mut self, enabled: bool) -> Self {
        self.use_static_zoom_level = enabled;
        self
    }

    /// Minimum map zoom. Defaults to 7 with a static zoom level, else 2.
    pub fn min_zoom(mut self, min_zoom: u8) -> Self {
        self.min_zoom = Some(min_zoom);
        self
    }

    pub fn simplify_factor(mut self, factor: f64) -> Self {
        self.simplify_factor = Some(factor);
        self
    }

    /// Adds a pass-through query parameter, replacing an earlier value for
    /// the same key.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fetch.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.fetch.timeout = timeout;
        self
    }

    pub fn missing_id_policy(mut self, policy: MissingIdPolicy) -> Self {
        self.missing_id_policy = policy;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let url = self.url.ok_or(ConfigError::MissingUrl)?;
        let collection_id = self.collection_id.ok_or(ConfigError::MissingCollectionId)?;

        let min_zoom = self.min_zoom.unwrap_or(if self.use_static_zoom_level {
            DEFAULT_MIN_ZOOM_STATIC
        } else {
            DEFAULT_MIN_ZOOM_DYNAMIC
        });

        let config = ServiceConfig {
            url,
            collection_id,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            use_static_zoom_level: self.use_static_zoom_level,
            min_zoom,
            simplify_factor: self.simplify_factor,
            params: self.params,
            missing_id_policy: self.missing_id_policy,
            fetch: self.fetch,
        };
        config.validate()?;
        Ok(config)
    }
}
