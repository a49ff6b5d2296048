// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Storage index handler

use crate::error::ServerResult;
use crate::state::AppState;
use axum::{extract::State, Json};

/// List registered storage names, sorted
pub async fn list_storages(State(state): State<AppState>) -> ServerResult<Json<Vec<String>>> {
    Ok(Json(state.registry.names()))
}
