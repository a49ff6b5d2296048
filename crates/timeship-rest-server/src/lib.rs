// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Timeship REST API server
//!
//! Read-only HTTP surface over the storage-access layer: directory
//! listings, node metadata, raw byte streaming, and snapshot enumeration,
//! all scoped by storage name and optionally by snapshot id.

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::Server;
