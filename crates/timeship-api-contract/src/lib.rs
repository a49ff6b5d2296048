//! Timeship REST API contract types
//!
//! This crate defines the schema types shared between the Timeship server
//! and its clients: directory listings, node metadata, snapshot lists, and
//! the error envelope every failing response carries.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
