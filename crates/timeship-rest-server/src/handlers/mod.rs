// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Request handlers

pub mod health;
pub mod nodes;
pub mod reserved;
pub mod snapshots;
pub mod storages;

use crate::error::{ServerError, ServerResult};
use timeship_storage::StorageError;

/// Run synchronous storage work off the async threads.
pub(crate) async fn blocking<T, F>(work: F) -> ServerResult<T>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ServerError::Internal(format!("blocking task failed: {}", err)))?
        .map_err(ServerError::from)
}

/// Fallback for unmatched routes. The requested path is deliberately not
/// echoed back.
pub async fn not_found() -> ServerError {
    ServerError::NotFound("resource not found".to_string())
}
