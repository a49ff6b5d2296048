// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Liveness endpoint

use crate::error::ServerResult;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Liveness payload: which storages are mounted and for how long
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Registered storage names, sorted
    pub storages: Vec<String>,
    /// Seconds since the registry was opened
    pub uptime_seconds: i64,
}

pub async fn health_check(State(state): State<AppState>) -> ServerResult<Json<HealthResponse>> {
    let uptime = chrono::Utc::now() - state.started_at;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        storages: state.registry.names(),
        uptime_seconds: uptime.num_seconds(),
    }))
}
