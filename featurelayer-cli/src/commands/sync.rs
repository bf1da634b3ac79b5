//! Sync command: run reconciliation cycles against a live service.
//!
//! Each `--bbox` is visited in order at the same zoom, as if the user
//! panned the map between them. Features accumulate across viewports the
//! same way they do on a real map.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use featurelayer::config::ServiceConfig;
use featurelayer::coord::BoundingBox;
use featurelayer::layer::{CycleOutcome, FeatureLayer};
use featurelayer::logging::init_logging;
use featurelayer::map::{InMemoryMap, SourceOptions};
use featurelayer::provider::{AsyncReqwestClient, OgcFeaturesProvider};
use tracing::info;

use super::common::{load_config_file, resolve_service_config, ServiceArgs};
use crate::error::CliError;

/// Map source id used for the synced collection.
const SOURCE_ID: &str = "featurelayer";

/// Arguments for the sync command.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Viewport as west,south,east,north in degrees (repeat to pan)
    #[arg(long = "bbox", required = true, allow_hyphen_values = true)]
    pub bboxes: Vec<BoundingBox>,

    /// Map zoom level
    #[arg(long)]
    pub zoom: f64,

    /// Viewport width in pixels, used for the simplification tolerance
    #[arg(long, default_value = "1024")]
    pub width: u32,

    /// Write the accumulated features as GeoJSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub service: ServiceArgs,
}

/// Run the sync command.
pub fn run(args: SyncArgs) -> Result<(), CliError> {
    let file = load_config_file(args.service.config.as_deref())?;
    let _logging_guard = init_logging(&file.logging.directory, &file.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let config = resolve_service_config(&file, &args.service)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(sync(args, config))
}

async fn sync(args: SyncArgs, config: ServiceConfig) -> Result<(), CliError> {
    let Some((first_bbox, rest)) = args.bboxes.split_first() else {
        return Err(CliError::Config("at least one --bbox is required".to_string()));
    };

    let http_client =
        AsyncReqwestClient::with_timeout(config.fetch.timeout).map_err(CliError::Provider)?;
    let provider = OgcFeaturesProvider::new(http_client, config.clone());

    println!(
        "Syncing {}/collections/{} at zoom {}",
        config.url.trim_end_matches('/'),
        config.collection_id,
        args.zoom
    );

    let map = Arc::new(InMemoryMap::new(args.zoom, *first_bbox, args.width));
    let (layer, first) = FeatureLayer::new(
        SOURCE_ID,
        Arc::clone(&map),
        config,
        SourceOptions::new(),
        provider,
    )
    .await?;

    // Viewports are driven explicitly below
    layer.disable();
    print_outcome(first_bbox, &first);

    for bbox in rest {
        map.set_viewport(args.zoom, *bbox);
        let outcome = layer.reconcile().await;
        print_outcome(bbox, &outcome);
    }

    println!();
    for summary in layer.band_summary() {
        println!(
            "{}: {} tiles requested, {} features",
            summary.band, summary.requested_tiles, summary.features
        );
    }

    if let Some(path) = &args.output {
        let collection = map.source_data(SOURCE_ID).unwrap_or_default();
        let json = collection.to_json().map_err(CliError::Serialize)?;
        fs::write(path, json).map_err(|error| CliError::FileWrite {
            path: path.clone(),
            error,
        })?;
        info!(path = %path.display(), features = collection.len(), "Wrote GeoJSON output");
        println!("Wrote {} features to {}", collection.len(), path.display());
    }

    layer.destroy();
    Ok(())
}

fn print_outcome(bbox: &BoundingBox, outcome: &CycleOutcome) {
    println!("[{}] {}", bbox, outcome);
    if let Some(report) = outcome.report() {
        for tile in &report.failed {
            println!("  failed: {} ({})", tile, tile.quadkey());
        }
    }
}
