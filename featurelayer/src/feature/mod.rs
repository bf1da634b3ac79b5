//! GeoJSON features as returned by an OGC API Features `items` endpoint.
//!
//! Geometry and properties are kept as opaque JSON. The engine only reads a
//! feature's `id` member, which drives deduplication across tiles.

mod merge;

pub use merge::{merge_features, MergeStats, MissingIdPolicy};

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Identity used to deduplicate features.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureId {
    /// A string `id` member.
    Text(String),
    /// A numeric `id` member, kept in its JSON text form.
    Number(String),
    /// SHA-256 of the feature's canonical JSON, for features without an `id`.
    Digest(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Text(s) | FeatureId::Number(s) => write!(f, "{}", s),
            FeatureId::Digest(d) => write!(f, "sha256:{}", d),
        }
    }
}

/// A single GeoJSON feature. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature(Value);

impl Feature {
    /// Wrap a JSON value as a feature.
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The underlying JSON.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The feature's `id` member, if present and a string or number.
    pub fn id(&self) -> Option<FeatureId> {
        match self.0.get("id")? {
            Value::String(s) => Some(FeatureId::Text(s.clone())),
            Value::Number(n) => Some(FeatureId::Number(n.to_string())),
            _ => None,
        }
    }
}

/// An ordered sequence of features.
///
/// Serializes as a GeoJSON `FeatureCollection`. When parsing, a missing or
/// `null` `features` member yields an empty collection and any other
/// members (`links`, `numberMatched`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct RawFeatureCollection {
    #[serde(default)]
    features: Option<Vec<Feature>>,
}

impl FeatureCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a collection from a JSON response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawFeatureCollection = serde_json::from_slice(bytes)?;
        Ok(Self {
            features: raw.features.unwrap_or_default(),
        })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Serialize as a GeoJSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl Serialize for FeatureCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureCollection", 2)?;
        state.serialize_field("type", "FeatureCollection")?;
        state.serialize_field("features", &self.features)?;
        state.end()
    }
}
