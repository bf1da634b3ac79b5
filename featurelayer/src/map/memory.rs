//! Headless map that keeps sources in memory.
//!
//! Used by the CLI to drive sync cycles without a display, and by tests to
//! observe exactly what the engine publishes.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use super::{MapView, MoveEnd, SourceOptions};
use crate::coord::BoundingBox;
use crate::feature::FeatureCollection;

/// Capacity of the move notification channel.
const MOVE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
struct Viewport {
    zoom: f64,
    bounds: BoundingBox,
    pixel_width: u32,
}

#[derive(Debug, Clone)]
struct Source {
    options: SourceOptions,
    data: FeatureCollection,
    updates: usize,
}

/// In-memory [`MapView`].
pub struct InMemoryMap {
    viewport: RwLock<Viewport>,
    sources: RwLock<HashMap<String, Source>>,
    moves: broadcast::Sender<MoveEnd>,
}

impl InMemoryMap {
    /// Create a map showing `bounds` at `zoom`, `pixel_width` pixels wide.
    pub fn new(zoom: f64, bounds: BoundingBox, pixel_width: u32) -> Self {
        let (moves, _) = broadcast::channel(MOVE_CHANNEL_CAPACITY);
        Self {
            viewport: RwLock::new(Viewport {
                zoom,
                bounds,
                pixel_width,
            }),
            sources: RwLock::new(HashMap::new()),
            moves,
        }
    }

    /// Moves the viewport and notifies subscribers.
    pub fn set_viewport(&self, zoom: f64, bounds: BoundingBox) {
        {
            let mut viewport = self.viewport.write();
            viewport.zoom = zoom;
            viewport.bounds = bounds;
        }
        // No subscribers is fine: nothing is listening yet
        let _ = self.moves.send(MoveEnd);
    }

    /// Contents of a source, if it exists.
    pub fn source_data(&self, source_id: &str) -> Option<FeatureCollection> {
        self.sources.read().get(source_id).map(|s| s.data.clone())
    }

    /// Options a source was created with.
    pub fn source_options(&self, source_id: &str) -> Option<SourceOptions> {
        self.sources.read().get(source_id).map(|s| s.options.clone())
    }

    /// Number of `set_source_data` calls a source has received.
    pub fn update_count(&self, source_id: &str) -> usize {
        self.sources
            .read()
            .get(source_id)
            .map(|s| s.updates)
            .unwrap_or(0)
    }

    pub fn has_source(&self, source_id: &str) -> bool {
        self.sources.read().contains_key(source_id)
    }

    /// Number of live move subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.moves.receiver_count()
    }
}

impl MapView for InMemoryMap {
    fn zoom(&self) -> f64 {
        self.viewport.read().zoom
    }

    fn bounds(&self) -> BoundingBox {
        self.viewport.read().bounds
    }

    fn pixel_width(&self) -> u32 {
        self.viewport.read().pixel_width
    }

    fn add_source(&self, source_id: &str, options: SourceOptions, data: FeatureCollection) {
        self.sources.write().insert(
            source_id.to_string(),
            Source {
                options,
                data,
                updates: 0,
            },
        );
    }

    fn set_source_data(&self, source_id: &str, data: FeatureCollection) {
        match self.sources.write().get_mut(source_id) {
            Some(source) => {
                source.data = data;
                source.updates += 1;
            }
            None => trace!(source_id, "Ignoring data for unknown source"),
        }
    }

    fn remove_source(&self, source_id: &str) {
        self.sources.write().remove(source_id);
    }

    fn subscribe_moves(&self) -> broadcast::Receiver<MoveEnd> {
        self.moves.subscribe()
    }
}
