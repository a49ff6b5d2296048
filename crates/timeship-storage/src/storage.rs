// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Uniform capability surface the HTTP layer consumes.
//!
//! A storage declares which capabilities it satisfies; callers probe the
//! set before dispatching instead of relying on an inheritance chain. All
//! methods are synchronous and expected to run under `spawn_blocking` on
//! an async runtime.

use crate::error::Result;
use crate::listing::ListOptions;
use crate::locator::Locator;
use std::fs::File;
use timeship_api_contract::{Node, SnapshotInfo};

/// One small capability contract a storage may satisfy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    List,
    Read,
    Stat,
    SnapshotList,
}

/// Open byte source for one file, with its declared media type
pub struct Content {
    pub file: File,
    /// Exact length in bytes, for `Content-Length`
    pub len: u64,
    /// Media type sniffed from the leading content bytes
    pub media_type: String,
}

/// Result of the listing pipeline for one directory
pub struct NodeListing {
    pub files: Vec<Node>,
    /// Recursive size of the subtree, when requested
    pub total_size: Option<u64>,
}

/// A named registration binding a root directory to a capability set.
///
/// The locator decides whether a call observes the live tree or a
/// snapshot; implementations multiplex the two behind identical semantics.
pub trait Storage: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &[Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Enumerate and enrich the children of the directory at `locator`.
    fn list(&self, locator: &Locator, options: &ListOptions) -> Result<NodeListing>;

    /// Open the file at `locator` for streaming.
    fn read(&self, locator: &Locator) -> Result<Content>;

    /// Stat the node at `locator`.
    fn stat(&self, locator: &Locator) -> Result<Node>;

    /// Enumerate the snapshots under which `locator`'s path is reachable.
    fn snapshots(&self, locator: &Locator) -> Result<Vec<SnapshotInfo>>;
}
