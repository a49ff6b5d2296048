// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! ZFS sidecar snapshot engine.
//!
//! ZFS exposes point-in-time views of a dataset through a hidden
//! `.zfs/snapshot` directory at the dataset root. Given a path inside a
//! storage, the engine walks upward to the nearest ancestor hosting such a
//! sidecar, enumerates its snapshots, parses timestamps out of the snapshot
//! names, and can open a fresh rooted gateway confined to one snapshot's
//! copy of the tree.

use crate::error::{Result, StorageError};
use crate::listing::mtime_seconds;
use crate::locator::{normalize_relpath, SnapshotId};
use crate::rooted::RootedDir;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use timeship_api_contract::SnapshotInfo;

/// Hidden directory ZFS mounts at a dataset root
pub const SIDECAR_DIR: &str = ".zfs";
/// Subdirectory of the sidecar holding one directory per snapshot
pub const SIDECAR_SNAPSHOT_DIR: &str = "snapshot";
/// Metadata key carrying the discovered sidecar-bearing ancestor
pub const META_ZFS_ROOT: &str = "zfs_root";

const KIND_ZFS: &str = "zfs";

/// Snapshot discovery and resolution for one storage root
#[derive(Debug)]
pub struct SnapshotEngine {
    /// Canonical storage root; the upward walk never goes above it
    root: PathBuf,
}

struct SidecarMatch {
    /// Snapshot-bearing ancestor, absolute
    ancestor: PathBuf,
    /// `<ancestor>/.zfs/snapshot`
    sidecar: PathBuf,
    /// Portion of the requested relpath below the ancestor
    below: String,
}

impl SnapshotEngine {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Enumerate the snapshots under which `relpath` is reachable,
    /// descending by timestamp. A path with no snapshot-bearing ancestor
    /// yields an empty list, not an error.
    pub fn enumerate(&self, relpath: &str) -> Result<Vec<SnapshotInfo>> {
        let Some(found) = self.find_sidecar(relpath)? else {
            return Ok(Vec::new());
        };

        let mut snapshots = Vec::new();
        let iter = std::fs::read_dir(&found.sidecar)
            .map_err(|e| StorageError::from_io(relpath, e))?;
        for entry in iter {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(path = %relpath, error = %err, "skipping unreadable sidecar entry");
                    continue;
                }
            };
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_dir() => metadata,
                Ok(_) => continue,
                Err(err) => {
                    tracing::warn!(path = %relpath, error = %err, "skipping sidecar entry without metadata");
                    continue;
                }
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => {
                    tracing::warn!(path = %relpath, "skipping sidecar entry with non-UTF-8 name");
                    continue;
                }
            };

            let timestamp =
                parse_snapshot_timestamp(&name).unwrap_or_else(|| mtime_seconds(&metadata));

            let mut metadata_map = std::collections::HashMap::new();
            metadata_map.insert(
                META_ZFS_ROOT.to_string(),
                found.ancestor.display().to_string(),
            );

            snapshots.push(SnapshotInfo {
                id: format!("{}:{}", KIND_ZFS, name),
                kind: KIND_ZFS.to_string(),
                timestamp,
                name,
                size: -1,
                metadata: metadata_map,
            });
        }

        snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(snapshots)
    }

    /// Open the view of `relpath` as of `id`: a rooted gateway confined to
    /// the snapshot's copy of the sidecar-bearing ancestor, plus the
    /// snapshot-relative subpath of `relpath` below that ancestor.
    pub fn open_snapshot(&self, relpath: &str, id: &SnapshotId) -> Result<(RootedDir, String)> {
        if id.kind != KIND_ZFS {
            return Err(StorageError::InvalidSnapshot(id.to_string()));
        }
        // The name becomes a path component under the sidecar.
        if id.name.contains('/') || id.name.contains('\0') || id.name == "." || id.name == ".." {
            return Err(StorageError::InvalidSnapshot(id.to_string()));
        }

        let Some(found) = self.find_sidecar(relpath)? else {
            return Err(StorageError::NotFound(relpath.to_string()));
        };

        let snapshot_root = found.sidecar.join(&id.name);
        let label = format!("snapshot '{}'", id);
        let gateway = RootedDir::open_root(&snapshot_root).map_err(|e| match e {
            StorageError::NotFound(_) | StorageError::InvalidParameter(_) => {
                StorageError::NotFound(label.clone())
            }
            StorageError::PermissionDenied(_) => StorageError::PermissionDenied(label.clone()),
            StorageError::Io { source, .. } => StorageError::Io {
                path: label.clone(),
                source,
            },
            other => other,
        })?;
        Ok((gateway, found.below))
    }

    /// Walk from `<root>/<relpath>` upward to the root, returning the first
    /// level hosting a `.zfs/snapshot` sidecar.
    fn find_sidecar(&self, relpath: &str) -> Result<Option<SidecarMatch>> {
        let rel = normalize_relpath(relpath)?;
        let segments: Vec<&str> = if rel.is_empty() {
            Vec::new()
        } else {
            rel.split('/').collect()
        };

        for take in (0..=segments.len()).rev() {
            let mut ancestor = self.root.clone();
            for segment in &segments[..take] {
                ancestor.push(segment);
            }
            let sidecar = ancestor.join(SIDECAR_DIR).join(SIDECAR_SNAPSHOT_DIR);
            if sidecar.is_dir() {
                return Ok(Some(SidecarMatch {
                    ancestor,
                    sidecar,
                    below: segments[take..].join("/"),
                }));
            }
        }
        Ok(None)
    }
}

struct NamePattern {
    regex: Regex,
    layout: &'static str,
    date_only: bool,
}

/// Ordered pattern table: more specific layouts (with seconds) first, so a
/// seconds-bearing name is never truncated to the minute by a broader rule.
static NAME_PATTERNS: LazyLock<Vec<NamePattern>> = LazyLock::new(|| {
    let pattern = |pattern: &str, layout: &'static str, date_only: bool| NamePattern {
        regex: Regex::new(pattern).expect("static snapshot name pattern"),
        layout,
        date_only,
    };
    vec![
        pattern(r"\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}", "%Y-%m-%d_%H-%M-%S", false),
        pattern(r"\d{8}_\d{6}", "%Y%m%d_%H%M%S", false),
        pattern(r"\d{4}-\d{2}-\d{2}_\d{2}-\d{2}", "%Y-%m-%d_%H-%M", false),
        pattern(r"\d{4}-\d{2}-\d{2}", "%Y-%m-%d", true),
    ]
});

/// Parse a UTC timestamp out of a snapshot name. Patterns match as
/// substrings anywhere in the name; the first pattern whose capture also
/// parses under its layout wins.
pub fn parse_snapshot_timestamp(name: &str) -> Option<i64> {
    for pattern in NAME_PATTERNS.iter() {
        let Some(found) = pattern.regex.find(name) else {
            continue;
        };
        let text = found.as_str();
        let parsed = if pattern.date_only {
            NaiveDate::parse_from_str(text, pattern.layout)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        } else {
            NaiveDateTime::parse_from_str(text, pattern.layout).ok()
        };
        if let Some(datetime) = parsed {
            return Some(datetime.and_utc().timestamp());
        }
    }
    None
}
