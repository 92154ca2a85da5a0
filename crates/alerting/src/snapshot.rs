//! Feed snapshots

use crate::error::SnapshotError;
use std::collections::HashSet;

/// An observed entity with a stable key and a comparable value
pub trait Signal {
    /// Raw value type, matched against the policy's value type
    type Value: Copy;

    /// Stable identifier, unique within one snapshot
    fn key(&self) -> &str;

    /// Current observed value
    fn value(&self) -> Self::Value;
}

/// One atomic observation of a feed
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    entities: Vec<T>,
    global_level: Option<u8>,
}

impl<T: Signal> Snapshot<T> {
    /// Build a snapshot, rejecting duplicate keys
    pub fn new(entities: Vec<T>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if !seen.insert(entity.key()) {
                return Err(SnapshotError::DuplicateKey(entity.key().to_string()));
            }
        }

        Ok(Self {
            entities,
            global_level: None,
        })
    }

    /// Attach the system-wide indicator consulted by a global gate
    pub fn with_global_level(mut self, level: Option<u8>) -> Self {
        self.global_level = level;
        self
    }

    pub fn entities(&self) -> &[T] {
        &self.entities
    }

    pub fn global_level(&self) -> Option<u8> {
        self.global_level
    }

    /// Keys present in this snapshot
    pub fn keys(&self) -> HashSet<&str> {
        self.entities.iter().map(Signal::key).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
