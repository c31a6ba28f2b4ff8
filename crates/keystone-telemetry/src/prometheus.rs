// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus exporter installation.

use std::net::SocketAddr;

use keystone_core::KeystoneError;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Installs the Prometheus recorder globally and serves `/metrics` on `address`.
///
/// Only one recorder can be installed per process. Must be called from within
/// a Tokio runtime.
pub fn install_prometheus(address: &str) -> Result<SocketAddr, KeystoneError> {
    let addr: SocketAddr = address.parse().map_err(|e| {
        KeystoneError::Config(format!("invalid prometheus address `{address}`: {e}"))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            KeystoneError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

    register_metrics();
    tracing::info!(%addr, "prometheus metrics exporter listening");
    Ok(addr)
}

fn register_metrics() {
    metrics::describe_gauge!(
        "keystone_catalog_plugins_loaded",
        "Plugins loaded into the catalog, labelled by kind"
    );
}
