// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for the storage-access layer.
//!
//! Messages reference the relative locator path, never the absolute on-disk
//! location.

use thiserror::Error;

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by gateways, the snapshot engine, and storages
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("invalid snapshot id '{0}'")]
    InvalidSnapshot(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown storage '{0}'")]
    StorageNotFound(String),

    #[error("'{0}' does not exist")]
    NotFound(String),

    /// Resolution of the path would leave the storage root
    #[error("'{0}' is not reachable")]
    PathEscape(String),

    #[error("'{0}' is not readable")]
    PermissionDenied(String),

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("I/O failure on '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Map an OS error for `relpath` onto the storage error taxonomy.
    pub fn from_io(relpath: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(relpath.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                StorageError::PermissionDenied(relpath.to_string())
            }
            _ => StorageError::Io {
                path: relpath.to_string(),
                source: err,
            },
        }
    }
}
