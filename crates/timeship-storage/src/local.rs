// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Local-directory storage: the live tree plus its ZFS sidecar snapshots.

use crate::error::{Result, StorageError};
use crate::listing::{self, ListOptions};
use crate::locator::Locator;
use crate::rooted::RootedDir;
use crate::snapshots::SnapshotEngine;
use crate::storage::{Capability, Content, NodeListing, Storage};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use timeship_api_contract::{Node, SnapshotInfo};

const CAPABILITIES: &[Capability] = &[
    Capability::List,
    Capability::Read,
    Capability::Stat,
    Capability::SnapshotList,
];

/// Storage over one local root directory
pub struct LocalStorage {
    name: String,
    /// Primary gateway, pinned at construction and shared by every request
    root: RootedDir,
    engine: SnapshotEngine,
}

/// Gateway view for one call: either the shared live gateway or a
/// per-call snapshot-scoped gateway that closes when the view drops.
enum GatewayView<'a> {
    Live(&'a RootedDir),
    Snapshot(RootedDir),
}

struct View<'a> {
    gateway: GatewayView<'a>,
    /// Path relative to the view's root (snapshot-relative for snapshots)
    rel: String,
}

impl View<'_> {
    fn dir(&self) -> &RootedDir {
        match &self.gateway {
            GatewayView::Live(dir) => dir,
            GatewayView::Snapshot(dir) => dir,
        }
    }
}

impl LocalStorage {
    pub fn new(name: &str, root: &Path) -> Result<Self> {
        let gateway = RootedDir::open_root(root)?;
        let engine = SnapshotEngine::new(gateway.root_path().to_path_buf());
        Ok(Self {
            name: name.to_string(),
            root: gateway,
            engine,
        })
    }

    /// Resolve the locator to a gateway view: the live tree, or a fresh
    /// snapshot-scoped gateway when the locator carries a snapshot id.
    fn view(&self, locator: &Locator) -> Result<View<'_>> {
        match &locator.snapshot {
            None => Ok(View {
                gateway: GatewayView::Live(&self.root),
                rel: locator.relpath.clone(),
            }),
            Some(id) => {
                let (gateway, below) = self.engine.open_snapshot(&locator.relpath, id)?;
                Ok(View {
                    gateway: GatewayView::Snapshot(gateway),
                    rel: below,
                })
            }
        }
    }
}

impl Storage for LocalStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn list(&self, locator: &Locator, options: &ListOptions) -> Result<NodeListing> {
        let view = self.view(locator)?;
        let metadata = view.dir().stat(&view.rel)?;
        if !metadata.is_dir() {
            return Err(StorageError::InvalidParameter(format!(
                "'{}' is not a directory",
                locator.relpath
            )));
        }

        let entries = view.dir().read_dir(&view.rel)?;
        let mut nodes = listing::enrich(view.dir(), &view.rel, &locator.relpath, entries);
        listing::sort_nodes(&mut nodes, options);
        let nodes = listing::filter_nodes(nodes, options);
        let files = listing::paginate(nodes, options);

        let total_size = if options.include_total_size {
            // The handle must outlive the walk: the walk root re-resolves
            // through it.
            let (_handle, walk_root) = view.dir().open_dir(&view.rel)?;
            Some(listing::subtree_size(&walk_root, options.cancel.as_deref()))
        } else {
            None
        };

        Ok(NodeListing { files, total_size })
    }

    fn read(&self, locator: &Locator) -> Result<Content> {
        let view = self.view(locator)?;
        let mut file = view.dir().open(&view.rel)?;
        let metadata = file
            .metadata()
            .map_err(|e| StorageError::from_io(&locator.relpath, e))?;
        if metadata.is_dir() {
            return Err(StorageError::InvalidParameter(format!(
                "'{}' is a directory",
                locator.relpath
            )));
        }

        let mut probe = [0u8; crate::sniff::SNIFF_LEN];
        let mut filled = 0;
        while filled < probe.len() {
            match file
                .read(&mut probe[filled..])
                .map_err(|e| StorageError::from_io(&locator.relpath, e))?
            {
                0 => break,
                n => filled += n,
            }
        }
        file.seek(SeekFrom::Start(0))
            .map_err(|e| StorageError::from_io(&locator.relpath, e))?;

        Ok(Content {
            file,
            len: metadata.len(),
            media_type: crate::sniff::detect_content_type(&probe[..filled]).to_string(),
        })
    }

    fn stat(&self, locator: &Locator) -> Result<Node> {
        let view = self.view(locator)?;
        let metadata = view.dir().stat(&view.rel)?;
        let basename = locator
            .relpath
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let mime_type = if metadata.is_dir() {
            None
        } else {
            listing::sniff_via_gateway(view.dir(), &view.rel)
        };
        Ok(listing::build_node(
            &locator.relpath,
            &basename,
            &metadata,
            mime_type,
        ))
    }

    fn snapshots(&self, locator: &Locator) -> Result<Vec<SnapshotInfo>> {
        self.engine.enumerate(&locator.relpath)
    }
}
