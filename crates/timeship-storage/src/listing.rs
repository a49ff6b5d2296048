// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Directory-listing pipeline: enrichment, sort, filter, pagination, and
//! the optional recursive total-size aggregation.

use crate::rooted::RootedDir;
use crate::sniff::{detect_content_type, SNIFF_LEN};
use std::fs::Metadata;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use timeship_api_contract::{Node, NodeType, SortKey, SortOrder};
use walkdir::WalkDir;

/// Query options applied by the listing pipeline
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Keep only entries of this type
    pub node_type: Option<NodeType>,
    /// Keep entries whose basename contains this pattern (`*` stripped)
    pub filter: Option<String>,
    /// Keep entries whose basename contains this, case-insensitively
    pub search: Option<String>,
    /// Compute the recursive size of the listed subtree
    pub include_total_size: bool,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
    /// Cooperative cancellation flag; the total-size walk stops at the
    /// next entry boundary once it is set
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Letters after the final `.` of a basename, empty when there is none.
pub fn extension_of(basename: &str) -> String {
    match basename.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => String::new(),
    }
}

pub(crate) fn mtime_seconds(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Build one node from a stat. `display_path` is the path reported to
/// clients, always relative to the storage root.
pub(crate) fn build_node(
    display_path: &str,
    basename: &str,
    metadata: &Metadata,
    mime_type: Option<String>,
) -> Node {
    let node_type = if metadata.is_dir() {
        NodeType::Dir
    } else {
        NodeType::File
    };
    Node {
        path: display_path.to_string(),
        node_type,
        basename: basename.to_string(),
        extension: extension_of(basename),
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        last_modified: mtime_seconds(metadata),
        mime_type,
    }
}

/// Enrich raw directory entries into nodes. `fs_dir` addresses the
/// directory inside `gateway` (snapshot-relative for snapshot views);
/// `display_dir` is the client-visible directory path.
pub(crate) fn enrich(
    gateway: &RootedDir,
    fs_dir: &str,
    display_dir: &str,
    entries: Vec<(String, Metadata)>,
) -> Vec<Node> {
    entries
        .into_iter()
        .map(|(name, metadata)| {
            let display_path = join_rel(display_dir, &name);
            let mime_type = if metadata.is_dir() {
                None
            } else {
                sniff_via_gateway(gateway, &join_rel(fs_dir, &name))
            };
            build_node(&display_path, &name, &metadata, mime_type)
        })
        .collect()
}

fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Read up to [`SNIFF_LEN`] leading bytes through the gateway and classify
/// them. Unreadable files simply get no media type.
pub(crate) fn sniff_via_gateway(gateway: &RootedDir, relpath: &str) -> Option<String> {
    let mut file = match gateway.open(relpath) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = %relpath, error = %err, "cannot sniff media type");
            return None;
        }
    };
    let mut probe = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < probe.len() {
        match file.read(&mut probe[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) => {
                tracing::debug!(path = %relpath, error = %err, "cannot sniff media type");
                return None;
            }
        }
    }
    Some(detect_content_type(&probe[..filled]).to_string())
}

/// Stable sort: directories first, then by the sort key within each group.
pub(crate) fn sort_nodes(nodes: &mut [Node], options: &ListOptions) {
    nodes.sort_by(|a, b| {
        let group = b.is_dir().cmp(&a.is_dir());
        group.then_with(|| {
            let ordering = match options.sort {
                SortKey::Name => a.basename.cmp(&b.basename),
                SortKey::Size => a.size.cmp(&b.size).then_with(|| a.basename.cmp(&b.basename)),
                SortKey::Mtime => a
                    .last_modified
                    .cmp(&b.last_modified)
                    .then_with(|| a.basename.cmp(&b.basename)),
            };
            match options.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        })
    });
}

/// Apply `type`, `filter`, and `search` without reordering.
pub(crate) fn filter_nodes(nodes: Vec<Node>, options: &ListOptions) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|node| {
            if let Some(node_type) = options.node_type {
                if node.node_type != node_type {
                    return false;
                }
            }
            if let Some(pattern) = &options.filter {
                // Full glob support is a future extension; asterisks are
                // stripped and the rest matches as a substring.
                let pattern = pattern.replace('*', "");
                if !pattern.is_empty() && !node.basename.contains(&pattern) {
                    return false;
                }
            }
            if let Some(query) = &options.search {
                if !node
                    .basename
                    .to_lowercase()
                    .contains(&query.to_lowercase())
                {
                    return false;
                }
            }
            true
        })
        .collect()
}

pub(crate) fn paginate(nodes: Vec<Node>, options: &ListOptions) -> Vec<Node> {
    let iter = nodes.into_iter().skip(options.offset);
    match options.limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

/// Recursive sum of regular-file sizes under `dir`. Symbolic links inside
/// the tree are not followed; `dir` itself may be a descriptor re-resolve
/// path (the walker descends the root link, nothing below it). Per-entry
/// errors are logged and skipped so one unreadable entry cannot abort the
/// aggregation.
pub(crate) fn subtree_size(dir: &Path, cancel: Option<&AtomicBool>) -> u64 {
    let mut total = 0u64;
    for entry in WalkDir::new(dir).follow_links(false) {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            tracing::debug!("total-size walk cancelled");
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping entry during total-size walk");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => total += metadata.len(),
            Err(err) => {
                tracing::warn!(error = %err, "skipping entry during total-size walk");
            }
        }
    }
    total
}
