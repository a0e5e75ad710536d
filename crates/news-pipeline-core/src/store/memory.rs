//! In-memory [`ContentStore`] implementation for tests.
//!
//! Each stage is a `BTreeMap` behind `std::sync::RwLock`, so `list` is
//! naturally sorted. A stage that has not been created behaves like a
//! missing folder.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::naming;

use super::{validate_key, ContentStore, Stage};

/// In-memory store for tests.
pub struct MemoryStore {
    stages: RwLock<BTreeMap<Stage, BTreeMap<String, String>>>,
}

impl MemoryStore {
    /// A store with no stage folders at all.
    pub fn new() -> Self {
        Self {
            stages: RwLock::new(BTreeMap::new()),
        }
    }

    /// A store with all three stage folders present and empty.
    pub fn with_stages() -> Self {
        let store = Self::new();
        for stage in Stage::ALL {
            store.create_stage(stage);
        }
        store
    }

    pub fn create_stage(&self, stage: Stage) {
        self.stages.write().unwrap().entry(stage).or_default();
    }

    /// Drop a stage folder and everything in it.
    pub fn remove_stage(&self, stage: Stage) {
        self.stages.write().unwrap().remove(&stage);
    }

    /// Number of entries in a stage, including ignored files.
    pub fn len(&self, stage: Stage) -> usize {
        self.stages
            .read()
            .unwrap()
            .get(&stage)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, stage: Stage) -> bool {
        self.len(stage) == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_stages()
    }
}

impl ContentStore for MemoryStore {
    fn read(&self, stage: Stage, key: &str) -> Result<String, StoreError> {
        validate_key(key)?;
        let stages = self.stages.read().unwrap();
        let entries = stages.get(&stage).ok_or(StoreError::MissingStage(stage))?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                stage,
                key: key.to_string(),
            })
    }

    fn write(&self, stage: Stage, key: &str, content: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut stages = self.stages.write().unwrap();
        let entries = stages
            .get_mut(&stage)
            .ok_or(StoreError::MissingStage(stage))?;
        entries.insert(key.to_string(), content.to_string());
        Ok(())
    }

    fn list(&self, stage: Stage) -> Result<Vec<String>, StoreError> {
        let stages = self.stages.read().unwrap();
        let entries = stages.get(&stage).ok_or(StoreError::MissingStage(stage))?;
        Ok(entries
            .keys()
            .filter(|k| !naming::is_ignored(k))
            .cloned()
            .collect())
    }

    fn exists(&self, stage: Stage, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        let stages = self.stages.read().unwrap();
        let entries = stages.get(&stage).ok_or(StoreError::MissingStage(stage))?;
        Ok(entries.contains_key(key))
    }

    fn remove(&self, stage: Stage, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut stages = self.stages.write().unwrap();
        let entries = stages
            .get_mut(&stage)
            .ok_or(StoreError::MissingStage(stage))?;
        entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                stage,
                key: key.to_string(),
            })
    }
}
