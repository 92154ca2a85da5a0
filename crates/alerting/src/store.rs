//! Alert State Store

use crate::policy::Tier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Last notified (or last observed) tier per entity key.
///
/// Serializes as a plain JSON object so it can be persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertStore {
    records: BTreeMap<String, Tier>,
}

impl AlertStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded tier for `key`
    pub fn get(&self, key: &str) -> Option<Tier> {
        self.records.get(key).copied()
    }

    /// Set the recorded tier for `key`
    pub fn upsert(&mut self, key: &str, tier: Tier) {
        match self.records.get_mut(key) {
            Some(existing) => *existing = tier,
            None => {
                self.records.insert(key.to_string(), tier);
            }
        }
    }

    /// Remove the record for `key`, returning whether one existed
    pub fn clear(&mut self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    /// Drop every record whose key is not in `current`; returns how many were dropped
    pub fn purge_missing(&mut self, current: &HashSet<&str>) -> usize {
        let before = self.records.len();
        self.records.retain(|key, _| current.contains(key.as_str()));
        let purged = before - self.records.len();
        if purged > 0 {
            debug!("Purged {} records missing from snapshot", purged);
        }
        purged
    }

    /// Remove all records
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Tier)> {
        self.records.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
