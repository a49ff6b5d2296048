// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Locator model: `<storage>://<relpath>[?snapshot=<id>]`.
//!
//! A locator names one node inside one storage and, optionally, the snapshot
//! in which to observe it. Locators are plain values built per request; they
//! are never retained across requests.

use crate::error::{Result, StorageError};
use url::Url;

/// Opaque snapshot identifier, wire form `<kind>:<name>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotId {
    pub kind: String,
    pub name: String,
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl std::str::FromStr for SnapshotId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() => Ok(Self {
                kind: kind.to_string(),
                name: name.to_string(),
            }),
            _ => Err(StorageError::InvalidSnapshot(s.to_string())),
        }
    }
}

/// Storage-qualified, snapshot-qualified handle for one node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    pub storage: String,
    /// Relative path inside the storage root; empty means the root itself
    pub relpath: String,
    pub snapshot: Option<SnapshotId>,
}

impl Locator {
    /// Build a locator from route parts: the storage path segment, the raw
    /// path tail, and the optional `snapshot` query value.
    pub fn parse(storage: &str, raw_path: &str, snapshot: Option<&str>) -> Result<Self> {
        let relpath = normalize_relpath(raw_path)?;
        let snapshot = snapshot.map(str::parse).transpose()?;
        Ok(Self {
            storage: storage.to_string(),
            relpath,
            snapshot,
        })
    }

    /// Locator for the storage root.
    pub fn root(storage: &str) -> Self {
        Self {
            storage: storage.to_string(),
            relpath: String::new(),
            snapshot: None,
        }
    }

    /// Child locator for `basename` under this locator's path. The snapshot
    /// is dropped: clients carry the snapshot id separately and re-assert it
    /// as a query parameter.
    pub fn child(&self, basename: &str) -> Self {
        let relpath = if self.relpath.is_empty() {
            basename.to_string()
        } else {
            format!("{}/{}", self.relpath, basename)
        };
        Self {
            storage: self.storage.clone(),
            relpath,
            snapshot: None,
        }
    }

    /// The relpath as handed to the FS gateway, which rejects the empty
    /// string: the storage root is addressed as `.`.
    pub fn fs_path(&self) -> &str {
        if self.relpath.is_empty() {
            "."
        } else {
            &self.relpath
        }
    }

    /// URL value form of this locator.
    pub fn to_url(&self) -> std::result::Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{}://{}", self.storage, self.relpath))?;
        if let Some(snapshot) = &self.snapshot {
            url.query_pairs_mut()
                .append_pair("snapshot", &snapshot.to_string());
        }
        Ok(url)
    }

    /// Parse the URL value form back into a locator.
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|_| StorageError::InvalidPath(raw.to_string()))?;
        let mut tail = String::new();
        if let Some(host) = url.host_str() {
            tail.push_str(host);
        }
        tail.push_str(url.path());
        let snapshot = url
            .query_pairs()
            .find(|(k, _)| k == "snapshot")
            .map(|(_, v)| v.into_owned());
        Self::parse(url.scheme(), &tail, snapshot.as_deref())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.storage, self.relpath)?;
        if let Some(snapshot) = &self.snapshot {
            write!(f, "?snapshot={}", snapshot)?;
        }
        Ok(())
    }
}

/// Normalize a raw path tail into a storage-relative path.
///
/// Strips leading slashes, collapses duplicate slashes, drops `.` segments,
/// and rejects `..` segments and embedded NUL bytes. The result never names
/// anything outside the storage root lexically; the gateway still re-verifies
/// resolution at the OS layer.
pub fn normalize_relpath(raw: &str) -> Result<String> {
    if raw.contains('\0') {
        return Err(StorageError::InvalidPath(raw.replace('\0', "\\0")));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(StorageError::InvalidPath(raw.to_string())),
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_and_collapses() {
        assert_eq!(normalize_relpath("/docs//note.txt").unwrap(), "docs/note.txt");
        assert_eq!(normalize_relpath("docs/./note.txt").unwrap(), "docs/note.txt");
        assert_eq!(normalize_relpath("").unwrap(), "");
        assert_eq!(normalize_relpath("/").unwrap(), "");
        assert_eq!(normalize_relpath(".").unwrap(), "");
    }

    #[test]
    fn normalize_rejects_parent_segments() {
        assert!(matches!(
            normalize_relpath("../etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            normalize_relpath("docs/../../etc"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn normalize_rejects_nul() {
        assert!(matches!(
            normalize_relpath("docs/note\0.txt"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn empty_relpath_maps_to_dot_for_the_gateway() {
        let locator = Locator::parse("local", "", None).unwrap();
        assert_eq!(locator.relpath, "");
        assert_eq!(locator.fs_path(), ".");
    }

    #[test]
    fn snapshot_id_round_trips() {
        let id: SnapshotId = "zfs:auto-daily-2025-11-09_00-00".parse().unwrap();
        assert_eq!(id.kind, "zfs");
        assert_eq!(id.name, "auto-daily-2025-11-09_00-00");
        assert_eq!(id.to_string(), "zfs:auto-daily-2025-11-09_00-00");
    }

    #[test]
    fn snapshot_id_rejects_malformed_input() {
        assert!("zfs".parse::<SnapshotId>().is_err());
        assert!(":name".parse::<SnapshotId>().is_err());
        assert!("zfs:".parse::<SnapshotId>().is_err());
    }

    #[test]
    fn child_joins_and_drops_snapshot() {
        let locator = Locator::parse("local", "docs", Some("zfs:snap")).unwrap();
        let child = locator.child("note.txt");
        assert_eq!(child.relpath, "docs/note.txt");
        assert_eq!(child.storage, "local");
        assert!(child.snapshot.is_none());

        let root_child = Locator::root("local").child("top.txt");
        assert_eq!(root_child.relpath, "top.txt");
    }

    #[test]
    fn url_form_round_trips() {
        let locator = Locator::parse("local", "docs/note.txt", Some("zfs:snap-1")).unwrap();
        let url = locator.to_url().unwrap();
        let parsed = Locator::from_url(url.as_str()).unwrap();
        assert_eq!(parsed, locator);
    }
}
