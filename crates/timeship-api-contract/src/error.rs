// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for API contract parsing

use thiserror::Error;

/// Errors that can occur while parsing API contract values
#[derive(Debug, Error)]
pub enum ApiContractError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Invalid sort key: {0}")]
    InvalidSortKey(String),

    #[error("Invalid sort order: {0}")]
    InvalidSortOrder(String),
}

/// Error envelope carried by every failing response.
///
/// Serialized with `Content-Type: application/problem+json`; `message` is
/// `"<title>: <detail>"` and `status` is always `false`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub status: bool,
}

impl ErrorEnvelope {
    pub fn new(title: &str, detail: &str) -> Self {
        Self {
            message: format!("{}: {}", title, detail),
            status: false,
        }
    }
}
