//! Host map abstraction
//!
//! A [`MapView`] is whatever displays the features: it reports the current
//! viewport, holds named data sources, and announces when the user stops
//! moving the map. The engine never renders anything itself.

mod memory;

pub use memory::InMemoryMap;

use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::coord::BoundingBox;
use crate::feature::FeatureCollection;

/// Options passed through to the host when a data source is created.
pub type SourceOptions = Map<String, Value>;

/// Notification that the viewport settled after a pan or zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEnd;

/// A map the engine can read its viewport from and publish features to.
pub trait MapView: Send + Sync {
    /// Current continuous zoom level.
    fn zoom(&self) -> f64;

    /// Current visible bounds.
    fn bounds(&self) -> BoundingBox;

    /// Width of the viewport in pixels.
    fn pixel_width(&self) -> u32;

    /// Registers a named data source holding `data`.
    fn add_source(&self, source_id: &str, options: SourceOptions, data: FeatureCollection);

    /// Replaces the whole contents of a named data source.
    fn set_source_data(&self, source_id: &str, data: FeatureCollection);

    /// Removes a named data source.
    fn remove_source(&self, source_id: &str);

    /// Subscribes to viewport-settled notifications.
    fn subscribe_moves(&self) -> broadcast::Receiver<MoveEnd>;
}
