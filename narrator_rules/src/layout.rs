//! Key order bookkeeping for re-emitting objects the way they were loaded.

use serde_json::{Map, Value};

/// The key order of a JSON object as it was loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct KeyOrder(Vec<String>);

impl KeyOrder {
    /// Record the key order of a loaded object.
    pub(crate) fn of(object: &Map<String, Value>) -> Self {
        Self(object.keys().cloned().collect())
    }

    /// Arrange `entries` in the recorded order.
    ///
    /// Keys that were not present at load time follow, in the order `entries`
    /// holds them.
    pub(crate) fn arrange(&self, entries: Map<String, Value>) -> Map<String, Value> {
        let mut arranged = Map::with_capacity(entries.len());
        for key in &self.0 {
            if let Some(value) = entries.get(key) {
                arranged.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in entries {
            if !arranged.contains_key(&key) {
                arranged.insert(key, value);
            }
        }
        arranged
    }
}
