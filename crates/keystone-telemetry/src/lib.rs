// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry for the Keystone trust server.
//!
//! Metrics flow through the [`MetricsService`](keystone_core::MetricsService)
//! sink. [`FacadeMetrics`] forwards to the metrics-rs facade so any installed
//! recorder (Prometheus via [`install_prometheus`]) collects them. The
//! datastore and key manager are decorated with call counters by
//! [`MetricsDataStore`] and [`MetricsKeyManager`].

pub mod call;
pub mod datastore;
pub mod keymanager;
pub mod metrics;
pub mod prometheus;

pub use call::{CallCounter, observe};
pub use datastore::MetricsDataStore;
pub use keymanager::MetricsKeyManager;
pub use metrics::{BlackholeMetrics, FacadeMetrics, PluginMetrics};
pub use prometheus::install_prometheus;
