// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Storage-access layer for Timeship.
//!
//! Everything the HTTP surface needs to serve a directory tree and its
//! point-in-time snapshot views: the locator model, the traversal-resistant
//! rooted gateway, the ZFS sidecar snapshot engine, the listing pipeline,
//! and the named storage registry. All code here is synchronous; callers on
//! an async runtime are expected to run it under `spawn_blocking`.

pub mod error;
pub mod listing;
pub mod local;
pub mod locator;
pub mod registry;
pub mod rooted;
pub mod sniff;
pub mod snapshots;
pub mod storage;

pub use error::{Result, StorageError};
pub use listing::ListOptions;
pub use local::LocalStorage;
pub use locator::{Locator, SnapshotId};
pub use registry::{StorageRegistry, DEFAULT_STORAGE};
pub use rooted::RootedDir;
pub use snapshots::SnapshotEngine;
pub use storage::{Capability, Content, NodeListing, Storage};
