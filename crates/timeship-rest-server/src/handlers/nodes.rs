// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Node handlers: directory listings, file metadata, and byte streaming.
//!
//! One endpoint unifies "describe" and "fetch": a directory always answers
//! with a JSON listing, a file answers with JSON metadata under
//! `Accept: application/json` and with its raw bytes under any other
//! `Accept`.

use crate::error::{ServerError, ServerResult};
use crate::handlers::blocking;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use timeship_api_contract::NodeListResponse;
use timeship_storage::{Capability, Content, ListOptions, Locator, Storage, StorageError};
use tokio_util::io::ReaderStream;

/// Query parameters accepted on node requests. Values arrive as raw
/// strings so malformed input maps onto the standard error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct NodeQuery {
    #[serde(rename = "type")]
    node_type: Option<String>,
    filter: Option<String>,
    search: Option<String>,
    download: Option<String>,
    fields: Option<String>,
    snapshot: Option<String>,
    sort: Option<String>,
    order: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

/// Marker inside `fields` that requests the recursive size aggregation
const TOTAL_SIZE_FIELD: &str = "(total_size)";

/// Listing at the storage root
pub async fn list_root(
    State(state): State<AppState>,
    Path(storage): Path<String>,
    headers: HeaderMap,
    Query(query): Query<NodeQuery>,
) -> ServerResult<Response> {
    serve_node(state, storage, String::new(), headers, query).await
}

/// Listing, metadata, or byte stream for the node at `path`
pub async fn get_node(
    State(state): State<AppState>,
    Path((storage, path)): Path<(String, String)>,
    headers: HeaderMap,
    Query(query): Query<NodeQuery>,
) -> ServerResult<Response> {
    serve_node(state, storage, path, headers, query).await
}

async fn serve_node(
    state: AppState,
    storage_name: String,
    raw_path: String,
    headers: HeaderMap,
    query: NodeQuery,
) -> ServerResult<Response> {
    let storage = state.registry.get(&storage_name)?;
    let locator = Locator::parse(&storage_name, &raw_path, query.snapshot.as_deref())?;

    require(&storage, Capability::Stat)?;
    let node = {
        let storage = Arc::clone(&storage);
        let locator = locator.clone();
        blocking(move || storage.stat(&locator)).await?
    };

    if node.is_dir() {
        require(&storage, Capability::List)?;
        let mut options = list_options(&query)?;
        // Dropping the guard (client disconnect included) stops an
        // in-flight total-size walk at its next entry boundary.
        let cancel = Arc::new(AtomicBool::new(false));
        let _cancel_guard = CancelGuard(Arc::clone(&cancel));
        options.cancel = Some(cancel);

        let dirname = locator.relpath.clone();
        let listing = {
            let storage = Arc::clone(&storage);
            blocking(move || storage.list(&locator, &options)).await?
        };
        let response = NodeListResponse {
            dirname,
            read_only: true,
            storages: state.registry.names(),
            files: listing.files,
            total_size: listing.total_size,
        };
        return Ok(Json(response).into_response());
    }

    if wants_json(&headers) {
        return Ok(Json(node).into_response());
    }

    require(&storage, Capability::Read)?;
    let content = {
        let storage = Arc::clone(&storage);
        let locator = locator.clone();
        blocking(move || storage.read(&locator)).await?
    };
    stream_response(content, &node.basename, parse_bool(query.download.as_deref())?)
}

/// Sets its flag when dropped, including on request cancellation.
struct CancelGuard(Arc<AtomicBool>);

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn require(storage: &Arc<dyn Storage>, capability: Capability) -> ServerResult<()> {
    if storage.supports(capability) {
        Ok(())
    } else {
        Err(StorageError::NotSupported(format!(
            "storage '{}' does not support {:?}",
            storage.name(),
            capability
        ))
        .into())
    }
}

/// `Accept: application/json` selects the JSON variant; everything else
/// receives the raw stream.
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| {
            accept
                .split(',')
                .filter_map(|part| part.split(';').next())
                .any(|media| media.trim() == "application/json")
        })
}

fn stream_response(content: Content, basename: &str, download: bool) -> ServerResult<Response> {
    let Content {
        file,
        len,
        media_type,
    } = content;
    let stream = ReaderStream::new(tokio::fs::File::from_std(file));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media_type)
        .header(header::CONTENT_LENGTH, len);
    if download {
        response = response.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", basename.replace('"', "\\\"")),
        );
    }
    response
        .body(Body::from_stream(stream))
        .map_err(|err| ServerError::Internal(err.to_string()))
}

fn list_options(query: &NodeQuery) -> ServerResult<ListOptions> {
    let parse = |name: &str, value: &str, err: String| {
        ServerError::from(StorageError::InvalidParameter(format!(
            "{} '{}': {}",
            name, value, err
        )))
    };

    let node_type = query
        .node_type
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e| parse("type", query.node_type.as_deref().unwrap_or(""), format!("{}", e)))?;
    let sort = query
        .sort
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e| parse("sort", query.sort.as_deref().unwrap_or(""), format!("{}", e)))?
        .unwrap_or_default();
    let order = query
        .order
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e| parse("order", query.order.as_deref().unwrap_or(""), format!("{}", e)))?
        .unwrap_or_default();

    Ok(ListOptions {
        node_type,
        filter: query.filter.clone(),
        search: query.search.clone(),
        include_total_size: query
            .fields
            .as_deref()
            .is_some_and(|fields| fields.contains(TOTAL_SIZE_FIELD)),
        sort,
        order,
        limit: parse_usize("limit", query.limit.as_deref())?,
        offset: parse_usize("offset", query.offset.as_deref())?.unwrap_or(0),
        cancel: None,
    })
}

pub(crate) fn parse_usize(name: &str, value: Option<&str>) -> ServerResult<Option<usize>> {
    match value {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            StorageError::InvalidParameter(format!("{} '{}' is not a number", name, raw)).into()
        }),
    }
}

pub(crate) fn parse_bool(value: Option<&str>) -> ServerResult<bool> {
    match value {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") | Some("") => Ok(false),
        Some(other) => Err(StorageError::InvalidParameter(format!(
            "download '{}' is not a boolean",
            other
        ))
        .into()),
    }
}
