//! Tiles command: show how a viewport maps onto tiles.
//!
//! Purely local; nothing is fetched.

use clap::Args;
use featurelayer::band::BandPolicy;
use featurelayer::coord::{tile_bbox, BoundingBox};
use featurelayer::layer::plan_tiles;

use crate::error::CliError;

/// Arguments for the tiles command.
#[derive(Debug, Args)]
pub struct TilesArgs {
    /// Viewport as west,south,east,north in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: BoundingBox,

    /// Map zoom level
    #[arg(long)]
    pub zoom: f64,

    /// Fetch at this fixed zoom level instead of the dynamic band
    #[arg(long)]
    pub static_zoom: Option<u8>,
}

/// Run the tiles command.
pub fn run(args: TilesArgs) -> Result<(), CliError> {
    if !args.zoom.is_finite() || args.zoom < 0.0 {
        return Err(CliError::Config(format!(
            "zoom must be a non-negative number, got {}",
            args.zoom
        )));
    }
    print!("{}", render(&args));
    Ok(())
}

fn render(args: &TilesArgs) -> String {
    let policy = match args.static_zoom {
        Some(level) => BandPolicy::Static(level),
        None => BandPolicy::Dynamic,
    };
    let band = policy.band_for(args.zoom);
    let plan = plan_tiles(&args.bbox, band);

    let mut out = format!(
        "Viewport: {}\nBand:     {} ({:?})\nPrimary:  {} quadkey={:?}\nTiles:    {}\n",
        args.bbox,
        band,
        policy,
        plan.primary,
        plan.primary.quadkey(),
        plan.candidates.len()
    );
    for tile in &plan.candidates {
        out.push_str(&format!(
            "  {:<14} {:<30} bbox={}\n",
            tile.to_string(),
            tile.quadkey(),
            tile_bbox(tile)
        ));
    }
    out
}
