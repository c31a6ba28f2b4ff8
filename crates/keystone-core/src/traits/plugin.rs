// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait that every plugin implements.

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::traits::host::HostServices;
use crate::types::{GlobalConfig, PluginKind};

/// The base trait for all Keystone plugins.
///
/// Provides identity, configuration, and lifecycle hooks. Instances are
/// created unconfigured by their factory and must be configured before use.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Returns the name this plugin instance is registered under.
    fn name(&self) -> &str;

    /// Returns the catalog slot this plugin fills.
    fn kind(&self) -> PluginKind;

    /// Applies the plugin's own configuration.
    ///
    /// `data` is the free-form `plugin_data` table from the server config,
    /// `Value::Null` when absent.
    async fn configure(
        &self,
        global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError>;

    /// Hands the plugin the host services it may call back into.
    ///
    /// Called once by the loader before [`Plugin::configure`].
    fn bind_host_services(&self, _services: &HostServices) {}

    /// Releases any resources held by the plugin.
    async fn shutdown(&self) -> Result<(), KeystoneError> {
        Ok(())
    }
}
