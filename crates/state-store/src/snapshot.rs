use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point-in-time copy of the store's state.
///
/// Maps slice names to slice data. Entity slices are JSON objects keyed by
/// the entity id's string form, each value being that entity's record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    slices: HashMap<String, Value>,
}

impl StateSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot from existing slices.
    pub fn from_slices(slices: HashMap<String, Value>) -> Self {
        Self { slices }
    }

    /// Sets a slice, replacing any previous data under that name.
    pub fn with_slice(mut self, name: impl Into<String>, data: Value) -> Self {
        self.slices.insert(name.into(), data);
        self
    }

    /// Gets a slice by name.
    pub fn slice(&self, name: &str) -> Option<&Value> {
        self.slices.get(name)
    }

    /// Gets the record stored under `key` in an entity slice.
    pub fn record(&self, slice: &str, key: &str) -> Option<&Value> {
        self.slices.get(slice)?.get(key)
    }

    /// Consumes the snapshot, returning its slices.
    pub fn into_slices(self) -> HashMap<String, Value> {
        self.slices
    }
}
