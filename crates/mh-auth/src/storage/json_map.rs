use crate::{KeyValueStore, StorageError, StorageResult};

use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A JSON object stored under one key, mapping identity names to records.
pub(crate) struct JsonMap<'a> {
    store: &'a dyn KeyValueStore,
    key: &'static str,
}

impl<'a> JsonMap<'a> {
    pub(crate) fn new(store: &'a dyn KeyValueStore, key: &'static str) -> Self {
        Self { store, key }
    }

    /// A missing or corrupted document reads as empty.
    pub(crate) fn load<T: DeserializeOwned>(&self) -> StorageResult<BTreeMap<String, T>> {
        let Some(contents) = self.store.get(self.key)? else {
            return Ok(BTreeMap::new());
        };

        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("Stored '{}' is corrupted, treating as empty: {e}", self.key);
                Ok(BTreeMap::new())
            }
        }
    }

    /// An empty map removes the key entirely.
    pub(crate) fn save<T: Serialize>(&self, map: &BTreeMap<String, T>) -> StorageResult<()> {
        if map.is_empty() {
            return self.store.remove(self.key);
        }

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::serialization(self.key, e))?;
        self.store.set(self.key, &json)
    }

    pub(crate) fn clear(&self) -> StorageResult<()> {
        self.store.remove(self.key)
    }
}
