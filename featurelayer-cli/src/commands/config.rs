//! Configuration management CLI commands.
//!
//! Provides `config path` and `config show` for inspecting the settings the
//! sync command starts from.

use std::path::PathBuf;

use clap::Subcommand;
use featurelayer::config::{config_file_path, ConfigFile};
use featurelayer::feature::MissingIdPolicy;

use super::common::load_config_file;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the settings loaded from the configuration file
    Show {
        /// Path to a configuration file (default: ~/.featurelayer/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
        ConfigCommands::Show { config } => {
            let file = load_config_file(config.as_deref())?;
            print!("{}", render(&file));
            Ok(())
        }
    }
}

fn or_unset<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "(not set)".to_string())
}

fn render(file: &ConfigFile) -> String {
    let service = &file.service;
    let missing_ids = match service.missing_id_policy {
        MissingIdPolicy::AlwaysNew => "always_new",
        MissingIdPolicy::ContentHash => "content_hash",
    };

    let mut out = format!(
        "[service]\nurl = {}\ncollection_id = {}\nlimit = {}\nuse_static_zoom_level = {}\n\
         min_zoom = {}\nsimplify_factor = {}\ntimeout = {}\nmissing_ids = {}\n",
        or_unset(&service.url),
        or_unset(&service.collection_id),
        or_unset(&service.limit),
        or_unset(&service.use_static_zoom_level),
        or_unset(&service.min_zoom),
        or_unset(&service.simplify_factor),
        service.timeout,
        missing_ids
    );

    out.push_str("\n[params]\n");
    for (key, value) in &file.params {
        out.push_str(&format!("{} = {}\n", key, value));
    }

    out.push_str("\n[headers]\n");
    for (name, _) in &file.headers {
        out.push_str(&format!("{} = ********\n", name));
    }

    out.push_str(&format!(
        "\n[logging]\ndirectory = {}\nfile = {}\n",
        file.logging.directory.display(),
        file.logging.file
    ));
    out
}
