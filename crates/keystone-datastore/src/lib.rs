// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for the Keystone trust server.
//!
//! [`SqlDataStore`] is the only supported datastore. It keeps bundles and
//! attested nodes in SQLite through tokio-rusqlite, with the schema managed by
//! embedded refinery migrations. [`CachedDataStore`] fronts any datastore with
//! a short-lived bundle cache.

pub mod cache;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod sql;

pub use cache::{BUNDLE_CACHE_TTL, CachedDataStore};
pub use database::Database;
pub use sql::{SQL_PLUGIN_NAME, SqlConfig, SqlDataStore};
