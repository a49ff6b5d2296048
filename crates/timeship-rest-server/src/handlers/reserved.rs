// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Reserved write endpoints.
//!
//! Create, delete, move, copy, upload, and archive operations exist in the
//! wire contract but are not implemented; they answer 501 with the
//! standard error envelope.

use crate::error::ServerError;

pub async fn not_implemented() -> ServerError {
    ServerError::NotImplemented("write operations are not available".to_string())
}
