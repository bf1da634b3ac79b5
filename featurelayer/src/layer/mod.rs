//! Feature layer: keeps a map source in sync with a remote collection.
//!
//! A [`FeatureLayer`] owns one map data source. Every time the map settles
//! after a pan or zoom it runs a reconciliation cycle:
//!
//! 1. Quantize the map zoom into a [`ZoomBand`]
//! 2. Compute the tiles covering the viewport at the band's zoom
//! 3. Mark tiles not yet requested for the band, before fetching anything
//! 4. Fetch the new tiles concurrently and merge their features
//! 5. Publish the band's whole accumulated collection to the map
//!
//! Tiles are requested at most once per band, so panning back over an area
//! costs nothing. A tile whose fetch fails is released and retried by the
//! next cycle that covers it.
//!
//! ```ignore
//! let (layer, first) = FeatureLayer::new("lakes", map, config, SourceOptions::new(), provider).await?;
//! println!("{}", first);
//! ```

mod cycle;

#[cfg(test)]
mod tests;

pub use cycle::{plan_tiles, simplify_tolerance, CycleOutcome, CycleReport, TilePlan};

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::band::{BandPolicy, ZoomBand, ZoomBandIndex};
use crate::config::{ConfigError, ServiceConfig};
use crate::coord::{tile_bbox, TileCoord};
use crate::feature::{FeatureCollection, MergeStats};
use crate::map::{MapView, SourceOptions};
use crate::provider::{FeatureSource, TileRequest};

/// Snapshot of one band's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSummary {
    pub band: ZoomBand,
    pub requested_tiles: usize,
    pub features: usize,
}

/// State shared between the layer handle and its spawned cycles.
struct LayerCore<M, P> {
    source_id: String,
    map: Arc<M>,
    config: ServiceConfig,
    policy: BandPolicy,
    provider: P,
    bands: Mutex<ZoomBandIndex>,
}

impl<M: MapView, P: FeatureSource> LayerCore<M, P> {
    async fn reconcile(&self) -> CycleOutcome {
        let zoom = self.map.zoom();
        let min_zoom = self.config.min_zoom;
        if zoom < f64::from(min_zoom) {
            debug!(source = %self.source_id, zoom, min_zoom, "Below minimum zoom, skipping cycle");
            return CycleOutcome::BelowMinZoom { zoom, min_zoom };
        }

        let viewport = self.map.bounds();
        let band = self.policy.band_for(zoom);
        let plan = plan_tiles(&viewport, band);
        let tolerance =
            simplify_tolerance(&viewport, self.map.pixel_width(), self.config.simplify_factor);

        // Marking happens under the lock so overlapping cycles never fetch
        // the same tile twice.
        let (generation, requested) = {
            let mut index = self.bands.lock();
            let generation = index.generation();
            let state = index.get_or_create(band);
            let requested: Vec<TileCoord> = plan
                .candidates
                .iter()
                .filter(|tile| state.mark_requested(tile))
                .copied()
                .collect();
            (generation, requested)
        };

        debug!(
            source = %self.source_id,
            band = %band,
            primary = %plan.primary,
            candidates = plan.candidates.len(),
            requested = requested.len(),
            "Planned cycle"
        );

        let requests: Vec<TileRequest> = requested
            .iter()
            .map(|&tile| TileRequest {
                tile,
                bbox: tile_bbox(&tile),
                tolerance,
            })
            .collect();
        let results = join_all(requests.iter().map(|r| self.provider.fetch_tile(r))).await;

        let mut report = CycleReport {
            band,
            primary: plan.primary,
            candidates: plan.candidates.len(),
            requested,
            failed: Vec::new(),
            features_added: 0,
            duplicates: 0,
            total_features: 0,
            tolerance,
        };

        let collection = {
            let mut index = self.bands.lock();
            if index.generation() != generation {
                info!(
                    source = %self.source_id,
                    band = %band,
                    discarded = report.requested.len(),
                    "Index was reset during cycle, discarding results"
                );
                return CycleOutcome::Superseded(report);
            }

            let state = index.get_or_create(band);
            let mut stats = MergeStats::default();
            for (request, result) in requests.iter().zip(results) {
                match result {
                    Ok(features) => {
                        stats.absorb(state.merge(features, self.config.missing_id_policy))
                    }
                    Err(e) => {
                        warn!(
                            source = %self.source_id,
                            provider = self.provider.name(),
                            tile = %request.tile,
                            error = %e,
                            "Tile fetch failed, will retry on a later cycle"
                        );
                        state.release(&request.tile);
                        report.failed.push(request.tile);
                    }
                }
            }

            report.features_added = stats.added;
            report.duplicates = stats.duplicates;
            report.total_features = state.feature_count();
            state.accumulator().clone()
        };

        self.map.set_source_data(&self.source_id, collection);

        if !report.requested.is_empty() {
            info!(
                source = %self.source_id,
                band = %band,
                requested = report.requested.len(),
                failed = report.failed.len(),
                features_added = report.features_added,
                total = report.total_features,
                "Published band collection"
            );
        }

        CycleOutcome::Published(report)
    }

    fn reset(&self) {
        self.bands.lock().reset_all();
        debug!(source = %self.source_id, "Band index reset");
    }
}

/// Background task reacting to map move notifications.
struct MoveListener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// A map data source kept in sync with an OGC API Features collection.
pub struct FeatureLayer<M: MapView + 'static, P: FeatureSource + 'static> {
    core: Arc<LayerCore<M, P>>,
    listener: Mutex<Option<MoveListener>>,
}

impl<M: MapView + 'static, P: FeatureSource + 'static> FeatureLayer<M, P> {
    /// Creates a layer, registers its source on `map` and runs the first
    /// cycle.
    ///
    /// The source is created empty with `options` plus `"type": "geojson"`.
    /// The layer starts listening for map moves before the first cycle runs.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `source_id` is empty or `config` fails
    /// validation. Nothing is added to the map in that case.
    pub async fn new(
        source_id: impl Into<String>,
        map: Arc<M>,
        config: ServiceConfig,
        options: SourceOptions,
        provider: P,
    ) -> Result<(Self, CycleOutcome), ConfigError> {
        let source_id = source_id.into();
        if source_id.is_empty() {
            return Err(ConfigError::MissingSourceId);
        }
        config.validate()?;

        let mut options = options;
        options.insert("type".to_string(), Value::from("geojson"));
        map.add_source(&source_id, options, FeatureCollection::new());

        info!(
            source = %source_id,
            provider = provider.name(),
            url = %config.url,
            collection = %config.collection_id,
            policy = ?config.band_policy(),
            "Feature layer created"
        );

        let layer = Self {
            core: Arc::new(LayerCore {
                source_id,
                policy: config.band_policy(),
                map,
                config,
                provider,
                bands: Mutex::new(ZoomBandIndex::new()),
            }),
            listener: Mutex::new(None),
        };

        layer.enable();
        let outcome = layer.refresh().await;
        Ok((layer, outcome))
    }

    /// Runs one reconciliation cycle for the current viewport.
    pub async fn reconcile(&self) -> CycleOutcome {
        self.core.reconcile().await
    }

    /// Discards every band and reconciles from scratch.
    pub async fn refresh(&self) -> CycleOutcome {
        self.core.reset();
        self.core.reconcile().await
    }

    /// Starts reacting to map moves. Does nothing if already enabled.
    ///
    /// Each move spawns its own cycle; cycles are not debounced and may
    /// overlap.
    pub fn enable(&self) {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut moves = self.core.map.subscribe_moves();
        let core = Arc::clone(&self.core);

        let handle = tokio::spawn(async move {
            debug!(source = %core.source_id, "Move listener started");
            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    event = moves.recv() => {
                        match event {
                            Ok(_) => {}
                            Err(RecvError::Lagged(skipped)) => {
                                debug!(source = %core.source_id, skipped, "Move notifications lagged");
                            }
                            Err(RecvError::Closed) => break,
                        }

                        let core = Arc::clone(&core);
                        tokio::spawn(async move {
                            let outcome = core.reconcile().await;
                            debug!(source = %core.source_id, %outcome, "Cycle finished");
                        });
                    }
                }
            }
            debug!(source = %core.source_id, "Move listener stopped");
        });

        *listener = Some(MoveListener { cancel, handle });
    }

    /// Stops reacting to map moves. Cycles already running still finish.
    pub fn disable(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.cancel.cancel();
            debug!(
                source = %self.core.source_id,
                finished = listener.handle.is_finished(),
                "Move listener cancelled"
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Stops listening and removes the layer's source from the map.
    pub fn destroy(self) {
        self.disable();
        self.core.map.remove_source(&self.core.source_id);
        info!(source = %self.core.source_id, "Feature layer destroyed");
    }

    pub fn source_id(&self) -> &str {
        &self.core.source_id
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.core.config
    }

    /// Accumulated collection of the band for the map's current zoom.
    ///
    /// `None` if that band has not been reconciled since the last reset.
    pub fn current_collection(&self) -> Option<FeatureCollection> {
        let band = self.core.policy.band_for(self.core.map.zoom());
        self.core
            .bands
            .lock()
            .get(band)
            .map(|state| state.accumulator().clone())
    }

    /// Per-band tile and feature counts, ordered by band.
    pub fn band_summary(&self) -> Vec<BandSummary> {
        self.core
            .bands
            .lock()
            .bands()
            .into_iter()
            .map(|(band, state)| BandSummary {
                band,
                requested_tiles: state.requested_count(),
                features: state.feature_count(),
            })
            .collect()
    }
}

impl<M: MapView + 'static, P: FeatureSource + 'static> Drop for FeatureLayer<M, P> {
    fn drop(&mut self) {
        self.disable();
    }
}
