// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use common::spawn_server;
use serde_json::Value;
use std::path::Path;

fn make_snapshot(root: &Path, name: &str) {
    std::fs::create_dir_all(root.join(".zfs/snapshot").join(name)).expect("mkdir sidecar");
}

#[tokio::test]
async fn snapshot_enumeration_descends_by_timestamp() {
    let root = tempfile::tempdir().expect("tempdir");
    make_snapshot(root.path(), "auto-daily-2025-11-09_00-00");
    make_snapshot(root.path(), "auto-hourly-2025-11-09_13-30");

    let (base, handle) = spawn_server(root.path()).await;

    let response = reqwest::get(format!("{}/api/storages/local/snapshots", base))
        .await
        .expect("request");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["storage"], "local");
    assert_eq!(body["path"], "");

    let snapshots = body["snapshots"].as_array().expect("snapshots");
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["id"], "zfs:auto-hourly-2025-11-09_13-30");
    assert_eq!(snapshots[0]["timestamp"], 1_762_695_000);
    assert_eq!(snapshots[1]["id"], "zfs:auto-daily-2025-11-09_00-00");
    assert_eq!(snapshots[1]["timestamp"], 1_762_646_400);
    assert_eq!(snapshots[0]["type"], "zfs");
    assert_eq!(snapshots[0]["name"], "auto-hourly-2025-11-09_13-30");

    handle.abort();
}

#[tokio::test]
async fn snapshot_scoped_listing_sees_deleted_paths() {
    let root = tempfile::tempdir().expect("tempdir");
    let snapshot_docs = root
        .path()
        .join(".zfs/snapshot/auto-daily-2025-11-09_00-00/docs");
    std::fs::create_dir_all(&snapshot_docs).expect("mkdir");
    std::fs::write(snapshot_docs.join("note.txt"), b"old").expect("write");

    let (base, handle) = spawn_server(root.path()).await;

    let scoped: Value = reqwest::get(format!(
        "{}/api/storages/local/nodes/docs?snapshot=zfs:auto-daily-2025-11-09_00-00",
        base
    ))
    .await
    .expect("request")
    .json()
    .await
    .expect("json");
    let files = scoped["files"].as_array().expect("files");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["basename"], "note.txt");
    assert_eq!(files[0]["path"], "docs/note.txt");

    // The live tree never had docs/.
    let live = reqwest::get(format!("{}/api/storages/local/nodes/docs", base))
        .await
        .expect("request");
    assert_eq!(live.status(), 404);

    handle.abort();
}

#[tokio::test]
async fn snapshot_scoped_stream_returns_the_old_bytes() {
    let root = tempfile::tempdir().expect("tempdir");
    let snapshot_root = root.path().join(".zfs/snapshot/snap-2025-11-09");
    std::fs::create_dir_all(&snapshot_root).expect("mkdir");
    std::fs::write(snapshot_root.join("kept.txt"), b"then").expect("write");
    std::fs::write(root.path().join("kept.txt"), b"now").expect("write");

    let (base, handle) = spawn_server(root.path()).await;
    let client = reqwest::Client::new();

    let snapshot_body = client
        .get(format!(
            "{}/api/storages/local/nodes/kept.txt?snapshot=zfs:snap-2025-11-09",
            base
        ))
        .header("Accept", "application/octet-stream")
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    assert_eq!(snapshot_body, "then");

    let live_body = client
        .get(format!("{}/api/storages/local/nodes/kept.txt", base))
        .header("Accept", "application/octet-stream")
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    assert_eq!(live_body, "now");

    handle.abort();
}

#[tokio::test]
async fn snapshots_for_subpaths_resolve_the_same_sidecar() {
    let root = tempfile::tempdir().expect("tempdir");
    make_snapshot(root.path(), "snap-2025-11-09");
    std::fs::create_dir_all(root.path().join("docs/deep")).expect("mkdir");

    let (base, handle) = spawn_server(root.path()).await;

    for path in ["", "/docs", "/docs/deep"] {
        let body: Value = reqwest::get(format!(
            "{}/api/storages/local/snapshots{}",
            base, path
        ))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
        let snapshots = body["snapshots"].as_array().expect("snapshots");
        assert_eq!(snapshots.len(), 1, "path {:?}", path);
        assert_eq!(snapshots[0]["id"], "zfs:snap-2025-11-09");
    }

    handle.abort();
}

#[tokio::test]
async fn no_sidecar_means_an_empty_list() {
    let root = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(root.path().join("docs")).expect("mkdir");

    let (base, handle) = spawn_server(root.path()).await;

    let body: Value = reqwest::get(format!("{}/api/storages/local/snapshots/docs", base))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["snapshots"].as_array().expect("snapshots").len(), 0);

    handle.abort();
}

#[tokio::test]
async fn snapshot_pagination_applies_after_sort() {
    let root = tempfile::tempdir().expect("tempdir");
    make_snapshot(root.path(), "snap-2025-11-07");
    make_snapshot(root.path(), "snap-2025-11-08");
    make_snapshot(root.path(), "snap-2025-11-09");

    let (base, handle) = spawn_server(root.path()).await;

    let body: Value = reqwest::get(format!(
        "{}/api/storages/local/snapshots?limit=1&offset=1",
        base
    ))
    .await
    .expect("request")
    .json()
    .await
    .expect("json");
    let snapshots = body["snapshots"].as_array().expect("snapshots");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0]["id"], "zfs:snap-2025-11-08");

    handle.abort();
}

#[tokio::test]
async fn malformed_snapshot_id_is_a_bad_request() {
    let root = tempfile::tempdir().expect("tempdir");
    make_snapshot(root.path(), "snap-2025-11-09");

    let (base, handle) = spawn_server(root.path()).await;

    let response = reqwest::get(format!(
        "{}/api/storages/local/nodes?snapshot=bogus",
        base
    ))
    .await
    .expect("request");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["status"], false);

    handle.abort();
}

#[tokio::test]
async fn unknown_snapshot_name_is_not_found() {
    let root = tempfile::tempdir().expect("tempdir");
    make_snapshot(root.path(), "snap-2025-11-09");

    let (base, handle) = spawn_server(root.path()).await;

    let response = reqwest::get(format!(
        "{}/api/storages/local/nodes?snapshot=zfs:no-such-snap",
        base
    ))
    .await
    .expect("request");
    assert_eq!(response.status(), 404);

    handle.abort();
}
