// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Named storage registry.
//!
//! Storages are registered once at boot and shared immutably afterwards;
//! shutdown releases them in reverse registration order.

use crate::error::{Result, StorageError};
use crate::storage::Storage;
use std::sync::Arc;

/// Name of the storage registered by default at boot
pub const DEFAULT_STORAGE: &str = "local";

#[derive(Default)]
pub struct StorageRegistry {
    /// Registration order is preserved for shutdown
    storages: Vec<(String, Arc<dyn Storage>)>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, storage: Arc<dyn Storage>) {
        let name = storage.name().to_string();
        tracing::info!(storage = %name, "registering storage");
        self.storages.push((name, storage));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Storage>> {
        self.storages
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, storage)| Arc::clone(storage))
            .ok_or_else(|| StorageError::StorageNotFound(name.to_string()))
    }

    /// The first registered storage, used when a request names none.
    pub fn default_storage(&self) -> Option<Arc<dyn Storage>> {
        self.storages.first().map(|(_, storage)| Arc::clone(storage))
    }

    /// Sorted storage names, as surfaced by `GET /storages`.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.storages.iter().map(|(name, _)| name.clone()).collect();
        names.sort();
        names
    }

    /// Release every storage in reverse registration order.
    pub fn shutdown(&mut self) {
        while let Some((name, storage)) = self.storages.pop() {
            tracing::info!(storage = %name, "closing storage");
            drop(storage);
        }
    }
}

impl Drop for StorageRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
