//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use featurelayer::config::{ConfigError, ConfigFileError};
use featurelayer::provider::ProviderError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Invalid command-line arguments
    Config(String),
    /// Failed to load the configuration file
    ConfigFile(ConfigFileError),
    /// Service settings are incomplete or invalid
    Service(ConfigError),
    /// Failed to create the HTTP client
    Provider(ProviderError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to serialize the feature collection
    Serialize(serde_json::Error),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Service(ConfigError::MissingUrl | ConfigError::MissingCollectionId) = self
        {
            eprintln!();
            eprintln!("Set the service in ~/.featurelayer/config.ini:");
            eprintln!("  [service]");
            eprintln!("  url = https://demo.pygeoapi.io/master");
            eprintln!("  collection_id = lakes");
            eprintln!("or pass --url and --collection.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Service(e) => write!(f, "Invalid service settings: {}", e),
            CliError::Provider(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Serialize(e) => write!(f, "Failed to serialize features: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Service(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Serialize(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Service(e)
    }
}
