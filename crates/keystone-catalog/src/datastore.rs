// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Datastore bootstrap.
//!
//! The datastore does not go through the plugin loader: its entry is taken out
//! of the configuration and the built-in `sql` implementation is configured
//! directly.

use std::sync::Arc;

use tracing::info;

use keystone_config::PluginConfigMap;
use keystone_core::{DataStore, GlobalConfig, KeystoneError, Plugin, PluginKind};
use keystone_datastore::{SQL_PLUGIN_NAME, SqlDataStore};

/// Remove the `DataStore` entry from `plugin_config` and bring up the
/// datastore it describes.
pub async fn load_data_store(
    global: &GlobalConfig,
    plugin_config: &mut PluginConfigMap,
) -> Result<Arc<dyn DataStore>, KeystoneError> {
    let kind = PluginKind::DataStore;
    let mut entries = plugin_config
        .remove(&kind.to_string())
        .unwrap_or_default()
        .into_iter();

    let (name, entry) = match (entries.next(), entries.next()) {
        (None, _) => {
            return Err(KeystoneError::Config(
                "expecting a DataStore plugin".to_string(),
            ));
        }
        (Some(only), None) => only,
        (Some(_), Some(_)) => {
            return Err(KeystoneError::Config(
                "only one DataStore plugin is allowed".to_string(),
            ));
        }
    };

    if name != SQL_PLUGIN_NAME || entry.is_external() {
        return Err(KeystoneError::UnsupportedPlugin {
            kind,
            name,
            builtin: SQL_PLUGIN_NAME.to_string(),
        });
    }
    if !entry.is_enabled() {
        return Err(KeystoneError::Config(
            "the DataStore plugin cannot be disabled".to_string(),
        ));
    }

    let data_store = Arc::new(SqlDataStore::new());
    data_store
        .configure(global, &entry.plugin_data)
        .await
        .map_err(|e| KeystoneError::SubsystemConfigure {
            kind,
            name: name.clone(),
            source: Box::new(e),
        })?;
    info!(%kind, name, "datastore configured");

    Ok(data_store)
}
