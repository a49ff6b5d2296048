// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Snapshot enumeration handlers

use crate::error::ServerResult;
use crate::handlers::nodes::parse_usize;
use crate::handlers::blocking;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use timeship_api_contract::SnapshotListResponse;
use timeship_storage::{Capability, Locator, StorageError};

/// Pagination applies after the descending-timestamp sort.
const DEFAULT_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotQuery {
    limit: Option<String>,
    offset: Option<String>,
}

/// Snapshots visible at the storage root
pub async fn list_root(
    State(state): State<AppState>,
    Path(storage): Path<String>,
    Query(query): Query<SnapshotQuery>,
) -> ServerResult<Json<SnapshotListResponse>> {
    serve_snapshots(state, storage, String::new(), query).await
}

/// Snapshots visible at `path`
pub async fn list_path(
    State(state): State<AppState>,
    Path((storage, path)): Path<(String, String)>,
    Query(query): Query<SnapshotQuery>,
) -> ServerResult<Json<SnapshotListResponse>> {
    serve_snapshots(state, storage, path, query).await
}

async fn serve_snapshots(
    state: AppState,
    storage_name: String,
    raw_path: String,
    query: SnapshotQuery,
) -> ServerResult<Json<SnapshotListResponse>> {
    let storage = state.registry.get(&storage_name)?;
    let locator = Locator::parse(&storage_name, &raw_path, None)?;

    if !storage.supports(Capability::SnapshotList) {
        return Err(StorageError::NotSupported(format!(
            "storage '{}' does not support snapshot listing",
            storage_name
        ))
        .into());
    }

    let snapshots = {
        let storage = Arc::clone(&storage);
        let locator = locator.clone();
        blocking(move || storage.snapshots(&locator)).await?
    };

    let offset = parse_usize("offset", query.offset.as_deref())?.unwrap_or(0);
    let limit = parse_usize("limit", query.limit.as_deref())?.unwrap_or(DEFAULT_LIMIT);
    let snapshots = snapshots.into_iter().skip(offset).take(limit).collect();

    Ok(Json(SnapshotListResponse {
        storage: storage_name,
        path: locator.relpath,
        snapshots,
    }))
}
