//! Configuration file handling for ~/.featurelayer/config.ini.
//!
//! Every setting is optional; command-line flags are layered on top by the
//! CLI before the final [`ServiceConfig`](super::ServiceConfig) is built.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::{ServiceConfigBuilder, DEFAULT_TIMEOUT_SECS};
use crate::feature::MissingIdPolicy;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[service]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub url: Option<String>,
    pub collection_id: Option<String>,
    pub limit: Option<u32>,
    pub use_static_zoom_level: Option<bool>,
    pub min_zoom: Option<u8>,
    pub simplify_factor: Option<f64>,
    /// HTTP timeout in seconds.
    pub timeout: u64,
    pub missing_id_policy: MissingIdPolicy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            url: None,
            collection_id: None,
            limit: None,
            use_static_zoom_level: None,
            min_zoom: None,
            simplify_factor: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            missing_id_policy: MissingIdPolicy::AlwaysNew,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: crate::logging::default_log_dir(),
            file: crate::logging::default_log_file().to_string(),
        }
    }
}

/// Parsed contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub service: ServiceSettings,
    /// `[params]`: pass-through query parameters.
    pub params: Vec<(String, String)>,
    /// `[headers]`: extra HTTP request headers.
    pub headers: Vec<(String, String)>,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.featurelayer/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Seed a [`ServiceConfigBuilder`] with every value set in the file.
    pub fn to_builder(&self) -> ServiceConfigBuilder {
        let service = &self.service;
        let mut builder = super::ServiceConfig::builder()
            .timeout(Duration::from_secs(service.timeout))
            .missing_id_policy(service.missing_id_policy);

        if let Some(url) = &service.url {
            builder = builder.url(url.clone());
        }
        if let Some(collection_id) = &service.collection_id {
            builder = builder.collection_id(collection_id.clone());
        }
        if let Some(limit) = service.limit {
            builder = builder.limit(limit);
        }
        if let Some(enabled) = service.use_static_zoom_level {
            builder = builder.use_static_zoom_level(enabled);
        }
        if let Some(min_zoom) = service.min_zoom {
            builder = builder.min_zoom(min_zoom);
        }
        if let Some(factor) = service.simplify_factor {
            builder = builder.simplify_factor(factor);
        }
        for (key, value) in &self.params {
            builder = builder.param(key.clone(), value);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.clone(), value.clone());
        }

        builder
    }
}

/// Directory holding the configuration file and default logs.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".featurelayer")
}

/// Default configuration file location.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
