// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Keystone trust server.
//!
//! Every section uses `#[serde(deny_unknown_fields)]` so typos are rejected at
//! startup. Plugin tables are keyed first by plugin kind and then by
//! implementation name:
//!
//! ```toml
//! [plugins.KeyManager.disk]
//! plugin_data = { keys_path = "/var/lib/keystone/keys.json" }
//! ```

use std::collections::BTreeMap;

use keystone_core::GlobalConfig;
use serde::{Deserialize, Serialize};

/// Per-kind, per-implementation plugin configuration.
///
/// Kinds are kept as raw strings; the catalog rejects unknown ones with a
/// loader error naming the offending key. Within a kind, entries are ordered
/// by implementation name, which is also the order plugins are loaded in.
pub type PluginConfigMap = BTreeMap<String, BTreeMap<String, PluginEntryConfig>>;

/// Top-level Keystone configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeystoneConfig {
    /// Server identity and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Metrics exporter settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Plugin configuration, keyed by kind then implementation name.
    #[serde(default)]
    pub plugins: PluginConfigMap,
}

impl KeystoneConfig {
    /// The settings shared with every plugin at configure time.
    pub fn global(&self) -> GlobalConfig {
        GlobalConfig {
            trust_domain: self.server.trust_domain.clone(),
        }
    }
}

/// Server identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Trust domain this server is authoritative for. Required.
    #[serde(default)]
    pub trust_domain: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            trust_domain: String::new(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Install the Prometheus recorder at startup.
    #[serde(default)]
    pub prometheus: bool,

    /// Listen address of the Prometheus `/metrics` endpoint.
    #[serde(default = "default_prometheus_address")]
    pub prometheus_address: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            prometheus: false,
            prometheus_address: default_prometheus_address(),
        }
    }
}

fn default_prometheus_address() -> String {
    "127.0.0.1:9988".to_string()
}

/// Configuration for one plugin implementation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginEntryConfig {
    /// Path to an externally hosted plugin binary. `None` selects the built-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_cmd: Option<String>,

    /// Arguments passed to an external plugin binary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_args: Vec<String>,

    /// Expected SHA-256 of an external plugin binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_checksum: Option<String>,

    /// Set to `false` to keep the entry in the file without loading it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Free-form settings passed to the plugin's `configure`.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub plugin_data: serde_json::Value,
}

impl PluginEntryConfig {
    /// True when the entry points at an externally hosted implementation.
    pub fn is_external(&self) -> bool {
        self.plugin_cmd
            .as_deref()
            .is_some_and(|cmd| !cmd.trim().is_empty())
    }

    /// True unless the entry is explicitly disabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}
