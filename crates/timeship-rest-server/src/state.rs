// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server state management

use crate::config::ServerConfig;
use crate::error::ServerResult;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use timeship_storage::{LocalStorage, StorageRegistry, DEFAULT_STORAGE};

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    /// Storage registry; immutable once constructed
    pub registry: Arc<StorageRegistry>,

    /// Server configuration
    pub config: ServerConfig,

    /// When the registry was opened; reported by the liveness endpoint
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Open the configured root and register it as the default storage.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let mut registry = StorageRegistry::new();
        let storage = LocalStorage::new(DEFAULT_STORAGE, &config.root)?;
        registry.register(Arc::new(storage));
        Ok(Self {
            registry: Arc::new(registry),
            config,
            started_at: Utc::now(),
        })
    }
}
