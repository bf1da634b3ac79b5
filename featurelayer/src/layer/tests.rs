use super::*;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde_json::json;
use tokio::sync::Semaphore;

use crate::coord::{children_of, descend_to_zoom, tile_overlaps, BoundingBox};
use crate::feature::{Feature, FeatureId};
use crate::map::InMemoryMap;
use crate::provider::ProviderError;

const SOURCE: &str = "lakes";

// ─────────────────────────────────────────────────────────────────────────────
// Scripted provider
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    responses: Mutex<HashMap<String, Result<FeatureCollection, ProviderError>>>,
    calls: Mutex<Vec<TileRequest>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

/// Returns scripted results per tile key. Unscripted tiles yield a single
/// feature whose id is the tile key.
#[derive(Clone, Default)]
struct ScriptedSource {
    script: Arc<Script>,
}

impl ScriptedSource {
    fn respond(&self, tile: &TileCoord, result: Result<FeatureCollection, ProviderError>) {
        self.script.responses.lock().insert(tile.quadkey(), result);
    }

    fn calls(&self) -> Vec<TileCoord> {
        self.script.calls.lock().iter().map(|r| r.tile).collect()
    }

    fn requests(&self) -> Vec<TileRequest> {
        self.script.calls.lock().clone()
    }

    /// Holds every subsequent fetch until the returned semaphore has permits.
    fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.script.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    fn release_hold(&self) {
        *self.script.gate.lock() = None;
    }
}

impl FeatureSource for ScriptedSource {
    async fn fetch_tile(&self, request: &TileRequest) -> Result<FeatureCollection, ProviderError> {
        self.script.calls.lock().push(request.clone());

        let gate = self.script.gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let scripted = self.script.responses.lock().get(&request.tile.quadkey()).cloned();
        scripted.unwrap_or_else(|| Ok(collection(&[request.tile.quadkey().as_str()])))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn collection(ids: &[&str]) -> FeatureCollection {
    ids.iter()
        .map(|id| Feature::from_value(json!({"type": "Feature", "id": id})))
        .collect::<Vec<_>>()
        .into()
}

fn ids(collection: &FeatureCollection) -> HashSet<FeatureId> {
    collection.features().iter().filter_map(|f| f.id()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

fn dynamic_config() -> ServiceConfig {
    ServiceConfig::builder()
        .url("https://example.com")
        .collection_id("lakes")
        .build()
        .unwrap()
}

fn static_config(min_zoom: u8) -> ServiceConfig {
    ServiceConfig::builder()
        .url("https://example.com")
        .collection_id("lakes")
        .use_static_zoom_level(true)
        .min_zoom(min_zoom)
        .build()
        .unwrap()
}

fn small_viewport() -> BoundingBox {
    BoundingBox::new(10.2, 45.2, 10.4, 45.3).unwrap()
}

/// A viewport inside the zoom 3 tile (col 4, row 2) straddling both of its
/// midlines.
fn straddling_viewport() -> (TileCoord, BoundingBox) {
    let parent = TileCoord::new(2, 4, 3);
    let west = tile_bbox(&parent).west;
    let north_west = tile_bbox(&children_of(&parent)[0]);
    let viewport = BoundingBox::new(
        west + 1.0,
        north_west.south - 1.0,
        north_west.east + 1.0,
        north_west.south + 1.0,
    )
    .unwrap();
    (parent, viewport)
}

/// Creates a layer with its move listener detached so tests drive every
/// cycle explicitly.
async fn quiet_layer(
    map: &Arc<InMemoryMap>,
    config: ServiceConfig,
    source: &ScriptedSource,
) -> (FeatureLayer<InMemoryMap, ScriptedSource>, CycleOutcome) {
    let (layer, first) =
        FeatureLayer::new(SOURCE, Arc::clone(map), config, SourceOptions::new(), source.clone())
            .await
            .unwrap();
    layer.disable();
    (layer, first)
}

fn published(outcome: &CycleOutcome) -> &CycleReport {
    match outcome {
        CycleOutcome::Published(report) => report,
        other => panic!("expected a published cycle, got {:?}", other),
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_rejects_empty_source_id() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let result = FeatureLayer::new(
        "",
        Arc::clone(&map),
        dynamic_config(),
        SourceOptions::new(),
        ScriptedSource::default(),
    )
    .await;

    assert!(matches!(result, Err(ConfigError::MissingSourceId)));
    assert_eq!(map.subscriber_count(), 0);
}

#[tokio::test]
async fn test_new_rejects_invalid_config() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let mut config = dynamic_config();
    config.collection_id.clear();

    let result = FeatureLayer::new(
        SOURCE,
        Arc::clone(&map),
        config,
        SourceOptions::new(),
        ScriptedSource::default(),
    )
    .await;

    assert!(matches!(result, Err(ConfigError::MissingCollectionId)));
    assert!(!map.has_source(SOURCE));
}

#[tokio::test]
async fn test_new_adds_geojson_source_and_runs_first_cycle() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let mut options = SourceOptions::new();
    options.insert("attribution".to_string(), json!("Lakes of the world"));

    let (layer, first) = FeatureLayer::new(
        SOURCE,
        Arc::clone(&map),
        dynamic_config(),
        options,
        source.clone(),
    )
    .await
    .unwrap();

    let stored = map.source_options(SOURCE).unwrap();
    assert_eq!(stored["type"], json!("geojson"));
    assert_eq!(stored["attribution"], json!("Lakes of the world"));

    let report = published(&first);
    assert_eq!(report.band, ZoomBand(4));
    assert_eq!(report.requested.len(), 1);
    assert_eq!(map.update_count(SOURCE), 1);
    assert_eq!(map.source_data(SOURCE).unwrap().len(), 1);
    assert!(layer.is_enabled());
    assert_eq!(layer.source_id(), SOURCE);
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciliation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_revisit_fetches_nothing_and_republishes() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, _) = quiet_layer(&map, dynamic_config(), &source).await;
    let before = map.source_data(SOURCE).unwrap();

    let outcome = layer.reconcile().await;

    let report = published(&outcome);
    assert!(report.requested.is_empty());
    assert_eq!(source.calls().len(), 1);
    assert_eq!(map.update_count(SOURCE), 2);
    assert_eq!(map.source_data(SOURCE).unwrap(), before);
}

#[tokio::test]
async fn test_below_min_zoom_is_a_no_op() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, _) = quiet_layer(&map, dynamic_config(), &source).await;

    map.set_viewport(1.5, BoundingBox::new(-60.0, -30.0, 60.0, 30.0).unwrap());
    let outcome = layer.reconcile().await;

    assert_eq!(
        outcome,
        CycleOutcome::BelowMinZoom {
            zoom: 1.5,
            min_zoom: 2
        }
    );
    assert_eq!(source.calls().len(), 1);
    assert_eq!(map.update_count(SOURCE), 1);
}

#[tokio::test]
async fn test_features_shared_between_tiles_are_merged_once() {
    let (_, viewport) = straddling_viewport();
    let map = Arc::new(InMemoryMap::new(5.5, viewport, 800));
    let source = ScriptedSource::default();
    let plan = plan_tiles(&viewport, ZoomBand(5));
    for tile in &plan.candidates {
        let own = tile.quadkey();
        source.respond(tile, Ok(collection(&["shared-river", own.as_str()])));
    }

    let (_, first) = quiet_layer(&map, static_config(5), &source).await;

    let report = published(&first);
    assert_eq!(report.requested.len(), 6);
    assert_eq!(report.features_added, 7);
    assert_eq!(report.duplicates, 5);

    let data = map.source_data(SOURCE).unwrap();
    assert_eq!(data.len(), 7);
    assert_eq!(ids(&data).len(), 7);
}

#[tokio::test]
async fn test_coarse_primary_requests_overlapping_descendants() {
    let (parent, viewport) = straddling_viewport();
    let map = Arc::new(InMemoryMap::new(6.2, viewport, 800));
    let source = ScriptedSource::default();

    let (_, first) = quiet_layer(&map, static_config(5), &source).await;

    let report = published(&first);
    assert_eq!(report.band, ZoomBand(5));
    assert_eq!(report.primary, parent);

    let expected: HashSet<TileCoord> = descend_to_zoom(&parent, 5)
        .into_iter()
        .filter(|t| tile_overlaps(t, &viewport))
        .collect();
    let fetched: HashSet<TileCoord> = source.calls().into_iter().collect();
    assert_eq!(fetched.len(), 6);
    assert_eq!(fetched, expected);
}

#[tokio::test]
async fn test_fine_primary_is_fetched_alone() {
    let tile = TileCoord::new(40, 33, 6);
    let bbox = tile_bbox(&tile);
    let viewport = BoundingBox::new(
        bbox.west + 0.1,
        bbox.south + 0.1,
        bbox.east - 0.1,
        bbox.north - 0.1,
    )
    .unwrap();
    let map = Arc::new(InMemoryMap::new(4.4, viewport, 800));
    let source = ScriptedSource::default();

    let (_, first) = quiet_layer(&map, dynamic_config(), &source).await;

    assert_eq!(published(&first).band, ZoomBand(4));
    assert_eq!(source.calls(), vec![tile]);
}

#[tokio::test]
async fn test_bands_are_tracked_independently() {
    let map = Arc::new(InMemoryMap::new(5.7, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, first) = quiet_layer(&map, dynamic_config(), &source).await;
    let band_four = map.source_data(SOURCE).unwrap();
    assert_eq!(published(&first).band, ZoomBand(4));

    map.set_viewport(7.1, small_viewport());
    let second = layer.reconcile().await;
    assert_eq!(published(&second).band, ZoomBand(6));
    assert_eq!(published(&second).requested.len(), 1);

    map.set_viewport(5.2, small_viewport());
    let third = layer.reconcile().await;
    assert!(published(&third).requested.is_empty());
    assert_eq!(map.source_data(SOURCE).unwrap(), band_four);

    let summary = layer.band_summary();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].band, ZoomBand(4));
    assert_eq!(summary[1].band, ZoomBand(6));
    assert!(summary.iter().all(|s| s.requested_tiles == 1));
    assert_eq!(source.calls().len(), 2);
}

#[tokio::test]
async fn test_refresh_reproduces_collection() {
    let (_, viewport) = straddling_viewport();
    let map = Arc::new(InMemoryMap::new(5.5, viewport, 800));
    let source = ScriptedSource::default();
    let (layer, _) = quiet_layer(&map, static_config(5), &source).await;
    let before = ids(&map.source_data(SOURCE).unwrap());

    let outcome = layer.refresh().await;

    assert_eq!(published(&outcome).requested.len(), 6);
    assert_eq!(source.calls().len(), 12);
    assert_eq!(ids(&map.source_data(SOURCE).unwrap()), before);
    assert_eq!(layer.band_summary().len(), 1);
}

#[tokio::test]
async fn test_failed_tile_is_released_and_siblings_merged() {
    let (_, viewport) = straddling_viewport();
    let plan = plan_tiles(&viewport, ZoomBand(5));
    let broken = plan.candidates[0];

    let map = Arc::new(InMemoryMap::new(5.5, viewport, 800));
    let source = ScriptedSource::default();
    source.respond(&broken, Err(ProviderError::HttpError("connection reset".to_string())));

    let (layer, first) = quiet_layer(&map, static_config(5), &source).await;

    let report = published(&first);
    assert_eq!(report.failed, vec![broken]);
    assert_eq!(report.total_features, 5);
    assert_eq!(map.source_data(SOURCE).unwrap().len(), 5);

    source.respond(&broken, Ok(collection(&["recovered"])));
    let second = layer.reconcile().await;

    let report = published(&second);
    assert_eq!(report.requested, vec![broken]);
    assert!(report.failed.is_empty());
    assert_eq!(report.total_features, 6);
}

#[tokio::test]
async fn test_cycle_straddling_refresh_is_superseded() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, _) = quiet_layer(&map, dynamic_config(), &source).await;

    // Pan somewhere new and hold its fetch in flight
    map.set_viewport(5.0, BoundingBox::new(-70.3, 40.1, -70.1, 40.2).unwrap());
    let gate = source.hold();

    let interrupt = async {
        wait_for(|| source.calls().len() == 2).await;
        source.release_hold();
        let refreshed = layer.refresh().await;
        gate.add_permits(1);
        refreshed
    };
    let (held, refreshed) = tokio::join!(layer.reconcile(), interrupt);

    assert!(matches!(held, CycleOutcome::Superseded(_)));
    assert!(refreshed.is_published());
    assert_eq!(map.update_count(SOURCE), 2);
    let summary = layer.band_summary();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].requested_tiles, 1);
    assert_eq!(summary[0].features, 1);
}

#[tokio::test]
async fn test_overlapping_cycles_fetch_each_tile_once() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, _) = quiet_layer(&map, dynamic_config(), &source).await;

    let viewport = BoundingBox::new(-70.3, 40.1, -70.1, 40.2).unwrap();
    map.set_viewport(5.0, viewport);
    let gate = source.hold();

    // The second cycle starts while the first one's tile is still in flight
    let overlapping = async {
        wait_for(|| source.calls().len() == 2).await;
        let outcome = layer.reconcile().await;
        gate.add_permits(1);
        outcome
    };
    let (held, overlapped) = tokio::join!(layer.reconcile(), overlapping);

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(plan_tiles(&viewport, ZoomBand(4)).candidates, vec![calls[1]]);

    let held = published(&held);
    let overlapped = published(&overlapped);
    assert_eq!(held.requested.len(), 1);
    assert!(overlapped.requested.is_empty());
    assert_eq!(overlapped.features_added, 0);
    assert_eq!(held.features_added, 1);

    let summary = layer.band_summary();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].requested_tiles, 2);
    assert_eq!(summary[0].features, 2);
}

#[tokio::test]
async fn test_tolerance_is_passed_to_provider() {
    let viewport = BoundingBox::new(0.5, 1.0, 10.5, 6.0).unwrap();
    let map = Arc::new(InMemoryMap::new(6.0, viewport, 1000));
    let source = ScriptedSource::default();
    let config = ServiceConfig::builder()
        .url("https://example.com")
        .collection_id("lakes")
        .simplify_factor(2.0)
        .build()
        .unwrap();

    let (_, first) = quiet_layer(&map, config, &source).await;

    assert_eq!(published(&first).tolerance, 0.02);
    assert!(source.requests().iter().all(|r| r.tolerance == 0.02));
}

#[tokio::test]
async fn test_current_collection_follows_map_zoom() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, _) = quiet_layer(&map, dynamic_config(), &source).await;

    assert_eq!(layer.current_collection().map(|c| c.len()), Some(1));

    map.set_viewport(9.0, small_viewport());
    assert!(layer.current_collection().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_move_end_triggers_cycle() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, _) = FeatureLayer::new(
        SOURCE,
        Arc::clone(&map),
        dynamic_config(),
        SourceOptions::new(),
        source.clone(),
    )
    .await
    .unwrap();

    map.set_viewport(5.0, BoundingBox::new(-70.3, 40.1, -70.1, 40.2).unwrap());
    wait_for(|| map.update_count(SOURCE) == 2).await;

    assert_eq!(source.calls().len(), 2);
    assert_eq!(map.source_data(SOURCE).unwrap().len(), 2);
    drop(layer);
}

#[tokio::test]
async fn test_disable_and_enable_are_idempotent() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let source = ScriptedSource::default();
    let (layer, _) = quiet_layer(&map, dynamic_config(), &source).await;
    layer.disable();
    assert!(!layer.is_enabled());
    wait_for(|| map.subscriber_count() == 0).await;

    map.set_viewport(5.0, BoundingBox::new(-70.3, 40.1, -70.1, 40.2).unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(map.update_count(SOURCE), 1);

    layer.enable();
    layer.enable();
    assert!(layer.is_enabled());
    assert_eq!(map.subscriber_count(), 1);
}

#[tokio::test]
async fn test_destroy_removes_source_and_stops_listening() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let (layer, _) = FeatureLayer::new(
        SOURCE,
        Arc::clone(&map),
        dynamic_config(),
        SourceOptions::new(),
        ScriptedSource::default(),
    )
    .await
    .unwrap();
    assert_eq!(map.subscriber_count(), 1);

    layer.destroy();

    assert!(!map.has_source(SOURCE));
    wait_for(|| map.subscriber_count() == 0).await;
}

#[tokio::test]
async fn test_drop_stops_listening() {
    let map = Arc::new(InMemoryMap::new(5.0, small_viewport(), 800));
    let (layer, _) = FeatureLayer::new(
        SOURCE,
        Arc::clone(&map),
        dynamic_config(),
        SourceOptions::new(),
        ScriptedSource::default(),
    )
    .await
    .unwrap();

    drop(layer);

    wait_for(|| map.subscriber_count() == 0).await;
    assert!(map.has_source(SOURCE));
}
