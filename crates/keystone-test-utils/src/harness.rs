// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for driving [`keystone_catalog::load`] in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keystone_catalog::{CatalogConfig, Closer, LoadedPlugins, Loader, LoaderConfig};
use keystone_config::{PluginConfigMap, PluginEntryConfig};
use keystone_core::{GlobalConfig, KeystoneError, Plugin};
use serde_json::json;

use crate::clock::ManualClock;
use crate::host::{MockAgentStore, MockIdentityProvider};
use crate::metrics::RecordingMetrics;
use crate::mock_plugins::MockKeyManager;

pub fn test_global() -> GlobalConfig {
    GlobalConfig {
        trust_domain: "example.org".into(),
    }
}

/// Plugin configuration holding only an in-memory `sql` datastore.
pub fn sql_in_memory() -> PluginConfigMap {
    let entry = PluginEntryConfig {
        plugin_data: json!({
            "database_type": "sqlite3",
            "connection_string": ":memory:",
        }),
        ..Default::default()
    };
    let mut config = PluginConfigMap::new();
    config.insert(
        "DataStore".to_string(),
        BTreeMap::from([("sql".to_string(), entry)]),
    );
    config
}

/// A catalog configuration with recording metrics, a manual clock, and empty
/// host services. Override fields with struct-update syntax.
pub fn catalog_config(plugin_config: PluginConfigMap, loader: Arc<dyn Loader>) -> CatalogConfig {
    CatalogConfig {
        global: test_global(),
        plugin_config,
        metrics: Arc::new(RecordingMetrics::default()),
        clock: Arc::new(ManualClock::new()),
        identity_provider: Arc::new(MockIdentityProvider::new(None)),
        agent_store: Arc::new(MockAgentStore::default()),
        metrics_service: Arc::new(RecordingMetrics::default()),
        loader,
    }
}

/// A loader that hands back a fixed set of plugins.
///
/// Records the [`LoaderConfig`] it was given and registers a shutdown for
/// every plugin it returns, in slot order.
pub struct StaticLoader {
    outcome: Result<LoadedPlugins, String>,
    received: Mutex<Option<LoaderConfig>>,
    calls: AtomicUsize,
}

impl StaticLoader {
    pub fn new(plugins: LoadedPlugins) -> Self {
        Self {
            outcome: Ok(plugins),
            received: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// A loader holding only a `memory` key manager.
    pub fn minimal() -> Self {
        Self::new(LoadedPlugins {
            node_attestors: Vec::new(),
            node_resolvers: Vec::new(),
            upstream_authority: None,
            key_manager: Arc::new(MockKeyManager::new("memory")),
            notifiers: Vec::new(),
        })
    }

    /// A loader whose `fill` always fails with `KeystoneError::Loader(message)`.
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            received: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The configuration passed to the most recent `fill`.
    pub fn received(&self) -> Option<LoaderConfig> {
        self.received.lock().unwrap().clone()
    }
}

fn push<P: Plugin + ?Sized>(closer: &mut Closer, plugin: &Arc<P>) {
    closer.push_shutdown(
        format!("{} `{}`", plugin.kind(), plugin.name()),
        Arc::clone(plugin),
    );
}

#[async_trait]
impl Loader for StaticLoader {
    async fn fill(&self, config: LoaderConfig) -> Result<(LoadedPlugins, Closer), KeystoneError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.received.lock().unwrap() = Some(config);

        let plugins = self.outcome.clone().map_err(KeystoneError::Loader)?;
        let mut closer = Closer::new();
        for plugin in &plugins.node_attestors {
            push(&mut closer, plugin);
        }
        for plugin in &plugins.node_resolvers {
            push(&mut closer, plugin);
        }
        if let Some(plugin) = &plugins.upstream_authority {
            push(&mut closer, plugin);
        }
        push(&mut closer, &plugins.key_manager);
        for plugin in &plugins.notifiers {
            push(&mut closer, plugin);
        }
        Ok((plugins, closer))
    }
}
