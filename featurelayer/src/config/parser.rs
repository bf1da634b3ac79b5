//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};
use crate::feature::MissingIdPolicy;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a number"))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [service] section
    if let Some(section) = ini.section(Some("service")) {
        let name = "service";
        if let Some(v) = section.get("url") {
            config.service.url = non_empty(v);
        }
        if let Some(v) = section.get("collection_id") {
            config.service.collection_id = non_empty(v);
        }
        if let Some(v) = section.get("limit") {
            config.service.limit = Some(parse_number(name, "limit", v)?);
        }
        if let Some(v) = section.get("use_static_zoom_level") {
            config.service.use_static_zoom_level = Some(parse_bool(name, "use_static_zoom_level", v)?);
        }
        if let Some(v) = section.get("min_zoom") {
            config.service.min_zoom = Some(parse_number(name, "min_zoom", v)?);
        }
        if let Some(v) = section.get("simplify_factor") {
            config.service.simplify_factor = Some(parse_number(name, "simplify_factor", v)?);
        }
        if let Some(v) = section.get("timeout") {
            config.service.timeout = parse_number(name, "timeout", v)?;
        }
        if let Some(v) = section.get("missing_ids") {
            config.service.missing_id_policy = match v.trim().to_lowercase().as_str() {
                "always_new" => MissingIdPolicy::AlwaysNew,
                "content_hash" => MissingIdPolicy::ContentHash,
                _ => {
                    return Err(invalid(
                        name,
                        "missing_ids",
                        v,
                        "must be 'always_new' or 'content_hash'",
                    ))
                }
            };
        }
    }

    // [params] section
    if let Some(section) = ini.section(Some("params")) {
        config.params = section
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }

    // [headers] section
    if let Some(section) = ini.section(Some("headers")) {
        config.headers = section
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory").and_then(non_empty) {
            config.logging.directory = expand_tilde(&v);
        }
        if let Some(v) = section.get("file").and_then(non_empty) {
            config.logging.file = v;
        }
    }

    Ok(config)
}
