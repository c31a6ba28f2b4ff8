// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin catalog for the Keystone trust server.
//!
//! [`load`] turns the `[plugins]` configuration into a [`Repository`]:
//!
//! 1. the `DataStore` entry is stripped from the configuration and the
//!    built-in `sql` datastore is configured directly;
//! 2. a [`Loader`] fills the remaining plugin slots;
//! 3. the datastore is wrapped with metrics and a bundle cache, the key
//!    manager with metrics;
//! 4. the loaded plugins are reshaped into the immutable [`Plugins`] registry,
//!    queried through the [`Catalog`] trait.
//!
//! The repository owns a [`Closer`] that releases every plugin and the
//! datastore. Callers must invoke [`Repository::close`]; nothing is released
//! on drop.

pub mod builtins;
pub mod catalog;
pub mod closer;
pub mod datastore;
pub mod hostservices;
pub mod loader;
pub mod repository;

pub use builtins::{BuiltInRegistry, known_kinds};
pub use catalog::{Catalog, Plugins};
pub use closer::Closer;
pub use datastore::load_data_store;
pub use hostservices::{BundleIdentityProvider, DataStoreAgentStore};
pub use loader::{BuiltinLoader, LoadedPlugins, Loader, LoaderConfig};
pub use repository::{CatalogConfig, Repository, load};
