// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! API contract types for the Timeship REST service

use crate::error::ApiContractError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of filesystem node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Dir,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::File => write!(f, "file"),
            NodeType::Dir => write!(f, "dir"),
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = ApiContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(NodeType::File),
            "dir" => Ok(NodeType::Dir),
            other => Err(ApiContractError::InvalidNodeType(other.to_string())),
        }
    }
}

/// One filesystem entry, relative to its storage root
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Path relative to the storage root
    pub path: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Last component of `path`
    pub basename: String,

    /// Letters after the final `.` of the basename, empty when none
    pub extension: String,

    /// Size in bytes; 0 for directories
    #[serde(rename = "file_size")]
    pub size: u64,

    /// Seconds since the Unix epoch
    pub last_modified: i64,

    /// Media type sniffed from leading content bytes (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Node {
    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Dir
    }
}

/// Directory listing response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeListResponse {
    /// Relative path of the listed directory
    pub dirname: String,

    pub read_only: bool,

    /// Names of every configured storage
    pub storages: Vec<String>,

    pub files: Vec<Node>,

    /// Recursive sum of file sizes under the directory, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

/// One snapshot visible for a path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Globally unique within the storage, `<kind>:<name>`
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    /// Seconds since the Unix epoch
    pub timestamp: i64,

    /// Human label, the sidecar subdirectory name
    pub name: String,

    /// Bytes, -1 when unknown
    pub size: i64,

    /// Open key/value map; holds at least the discovered sidecar root
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, String>,
}

/// Snapshot enumeration response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotListResponse {
    pub storage: String,

    /// Relative path the snapshots were resolved against
    pub path: String,

    /// Descending by timestamp, stable by id for ties
    pub snapshots: Vec<SnapshotInfo>,
}

/// Listing sort key override
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Mtime,
}

impl std::str::FromStr for SortKey {
    type Err = ApiContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "mtime" => Ok(SortKey::Mtime),
            other => Err(ApiContractError::InvalidSortKey(other.to_string())),
        }
    }
}

/// Listing sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = ApiContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ApiContractError::InvalidSortOrder(other.to_string())),
        }
    }
}
