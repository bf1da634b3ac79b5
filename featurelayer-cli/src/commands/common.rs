//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use featurelayer::config::{ConfigFile, ServiceConfig};

use crate::error::CliError;

/// Service settings that override the configuration file.
#[derive(Debug, Clone, Default, Args)]
pub struct ServiceArgs {
    /// Path to a configuration file (default: ~/.featurelayer/config.ini)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the OGC API Features service
    #[arg(long)]
    pub url: Option<String>,

    /// Collection identifier
    #[arg(long)]
    pub collection: Option<String>,

    /// Maximum number of features per tile request
    #[arg(long)]
    pub limit: Option<u32>,

    /// Always fetch at this zoom level (also the minimum zoom)
    #[arg(long)]
    pub static_zoom: Option<u8>,

    /// Minimum map zoom at which features are fetched
    #[arg(long)]
    pub min_zoom: Option<u8>,

    /// Simplification factor forwarded as `simplifyFactor`
    #[arg(long)]
    pub simplify_factor: Option<f64>,

    /// Extra query parameter as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Extra request header as name=value (repeatable)
    #[arg(long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Parses `key=value`. The value may itself contain `=`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

/// Loads the configuration file at `path`, or the default one.
pub fn load_config_file(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "Config file '{}' does not exist",
                    path.display()
                )));
            }
            ConfigFile::load_from(path)?
        }
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Builds the service configuration from the file, with flags taking
/// precedence.
pub fn resolve_service_config(
    file: &ConfigFile,
    args: &ServiceArgs,
) -> Result<ServiceConfig, CliError> {
    let mut builder = file.to_builder();

    if let Some(url) = &args.url {
        builder = builder.url(url.clone());
    }
    if let Some(collection) = &args.collection {
        builder = builder.collection_id(collection.clone());
    }
    if let Some(limit) = args.limit {
        builder = builder.limit(limit);
    }
    if let Some(level) = args.static_zoom {
        builder = builder.use_static_zoom_level(true).min_zoom(level);
    } else if let Some(min_zoom) = args.min_zoom {
        builder = builder.min_zoom(min_zoom);
    }
    if let Some(factor) = args.simplify_factor {
        builder = builder.simplify_factor(factor);
    }
    for (key, value) in &args.params {
        builder = builder.param(key.clone(), value);
    }
    for (name, value) in &args.headers {
        builder = builder.header(name.clone(), value.clone());
    }
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    Ok(builder.build()?)
}
