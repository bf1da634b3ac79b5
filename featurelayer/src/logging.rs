//! Logging infrastructure for FeatureLayer.
//!
//! Provides structured logging with file output and console output:
//! - Writes to `~/.featurelayer/logs/featurelayer.log` (cleared on start)
//! - Also prints to stderr so command output on stdout stays clean
//! - Configurable via RUST_LOG environment variable

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Creates `log_dir` if needed and truncates the log file inside it.
///
/// Returns the full path of the log file.
pub fn prepare_log_file(log_dir: &Path, log_file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(log_file);
    fs::write(&log_path, "")?;
    Ok(log_path)
}

/// Initialize logging system.
///
/// Sets up output to both the log file and stderr. The filter defaults to
/// `info` unless RUST_LOG is set.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(log_dir: &Path, log_file: &str) -> Result<LoggingGuard, io::Error> {
    prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Default log directory: `~/.featurelayer/logs`.
pub fn default_log_dir() -> PathBuf {
    crate::config::config_directory().join("logs")
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "featurelayer.log"
}
