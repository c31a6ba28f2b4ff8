// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Keystone.
//!
//! Deterministic stand-ins for every plugin kind and host service, plus
//! fixtures for loading a catalog without real plugins.
//!
//! # Components
//!
//! - [`MemoryDataStore`]: in-memory datastore that counts bundle fetches
//! - [`MockNodeAttestor`], [`MockNodeResolver`], [`MockUpstreamAuthority`],
//!   [`MockKeyManager`], [`MockNotifier`]: plugins reporting to a [`PluginProbe`]
//! - [`RecordingMetrics`] and [`ManualClock`]
//! - [`StaticLoader`] and [`catalog_config`] for catalog tests

pub mod clock;
pub mod datastore;
pub mod harness;
pub mod host;
pub mod metrics;
pub mod mock_plugins;

pub use clock::ManualClock;
pub use datastore::MemoryDataStore;
pub use harness::{StaticLoader, catalog_config, sql_in_memory, test_global};
pub use host::{MockAgentStore, MockIdentityProvider, test_host_services};
pub use metrics::{Recorded, RecordingMetrics};
pub use mock_plugins::{
    MockKeyManager, MockNodeAttestor, MockNodeResolver, MockNotifier, MockUpstreamAuthority,
    PluginProbe,
};
