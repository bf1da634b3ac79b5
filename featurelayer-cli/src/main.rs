//! FeatureLayer CLI - Command-line interface
//!
//! This binary provides a command-line interface to the FeatureLayer library.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::sync::SyncArgs;
use commands::tiles::TilesArgs;

#[derive(Parser)]
#[command(name = "featurelayer")]
#[command(version = featurelayer::VERSION)]
#[command(about = "Sync OGC API Features collections with a map viewport", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tiles a viewport maps to (no network access)
    Tiles(TilesArgs),

    /// Fetch features for one or more viewports from a live service
    Sync(SyncArgs),

    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tiles(args) => commands::tiles::run(args),
        Commands::Sync(args) => commands::sync::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_with_negative_bbox_and_params() {
        let cli = Cli::try_parse_from([
            "featurelayer",
            "sync",
            "--bbox",
            "-10,40,-5,45",
            "--bbox",
            "-5,40,0,45",
            "--zoom",
            "6.5",
            "--collection",
            "lakes",
            "--param",
            "properties=name",
        ])
        .unwrap();

        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.bboxes.len(), 2);
                assert_eq!(args.bboxes[0].west, -10.0);
                assert_eq!(args.width, 1024);
                assert_eq!(args.service.collection.as_deref(), Some("lakes"));
                assert_eq!(
                    args.service.params,
                    vec![("properties".to_string(), "name".to_string())]
                );
            }
            _ => panic!("expected sync command"),
        }
    }

    #[test]
    fn test_sync_requires_bbox() {
        assert!(Cli::try_parse_from(["featurelayer", "sync", "--zoom", "5"]).is_err());
    }

    #[test]
    fn test_tiles_rejects_inverted_bbox() {
        let result =
            Cli::try_parse_from(["featurelayer", "tiles", "--bbox", "10,0,5,1", "--zoom", "5"]);
        assert!(result.is_err());
    }
}
