// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog assembly.

use std::ops::Deref;
use std::sync::Arc;

use tracing::{info, warn};

use keystone_config::PluginConfigMap;
use keystone_core::types::Label;
use keystone_core::{
    AgentStore, Clock, DataStore, GlobalConfig, HostServices, IdentityProvider, KeystoneError,
    MetricsService, PluginKind,
};
use keystone_datastore::CachedDataStore;
use keystone_telemetry::{MetricsDataStore, MetricsKeyManager};

use crate::builtins::{BuiltInRegistry, known_kinds};
use crate::catalog::{Catalog, Plugins};
use crate::closer::Closer;
use crate::datastore::load_data_store;
use crate::loader::{Loader, LoaderConfig};

/// Inputs to [`load`].
pub struct CatalogConfig {
    pub global: GlobalConfig,
    pub plugin_config: PluginConfigMap,
    /// Sink for the datastore and key manager call metrics.
    pub metrics: Arc<dyn MetricsService>,
    /// Clock driving the bundle cache.
    pub clock: Arc<dyn Clock>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub agent_store: Arc<dyn AgentStore>,
    /// Metrics host service handed to plugins.
    pub metrics_service: Arc<dyn MetricsService>,
    pub loader: Arc<dyn Loader>,
}

/// The loaded catalog together with the handle that releases it.
///
/// Dropping a repository releases nothing; call [`Repository::close`].
pub struct Repository {
    catalog: Plugins,
    closer: Closer,
}

impl Repository {
    pub fn catalog(&self) -> &Plugins {
        &self.catalog
    }

    /// Release every plugin and the datastore. Later calls do nothing.
    pub async fn close(&self) -> Result<(), KeystoneError> {
        self.closer.close().await
    }
}

impl Deref for Repository {
    type Target = Plugins;

    fn deref(&self) -> &Plugins {
        &self.catalog
    }
}

async fn release_after_failure(closer: &Closer) {
    if let Err(e) = closer.close().await {
        warn!(error = %e, "failed to release catalog resources after load failure");
    }
}

/// Bootstrap the datastore, load the remaining plugins, decorate them, and
/// assemble the catalog.
///
/// Nothing is left running when an error is returned.
pub async fn load(config: CatalogConfig) -> Result<Repository, KeystoneError> {
    let CatalogConfig {
        global,
        mut plugin_config,
        metrics,
        clock,
        identity_provider,
        agent_store,
        metrics_service,
        loader,
    } = config;

    let data_store = load_data_store(&global, &mut plugin_config).await?;
    let mut closer = Closer::new();
    closer.push_shutdown("DataStore `sql`", Arc::clone(&data_store));

    let loader_config = LoaderConfig {
        global,
        builtins: Arc::new(keystone_plugins::builtins().into_iter().collect::<BuiltInRegistry>()),
        known_kinds: known_kinds(),
        plugin_config,
        host_services: HostServices {
            identity_provider,
            agent_store,
            metrics: metrics_service,
        },
    };
    let (mut loaded, plugin_closer) = match loader.fill(loader_config).await {
        Ok(filled) => filled,
        Err(err) => {
            release_after_failure(&closer).await;
            return Err(err);
        }
    };
    closer.absorb(plugin_closer);

    let data_store: Arc<dyn DataStore> = Arc::new(CachedDataStore::new(
        MetricsDataStore::wrap(data_store, Arc::clone(&metrics)),
        clock,
    ));
    loaded.key_manager = MetricsKeyManager::wrap(loaded.key_manager, Arc::clone(&metrics));

    let catalog = match Plugins::from_loaded(data_store, loaded) {
        Ok(catalog) => catalog,
        Err(err) => {
            release_after_failure(&closer).await;
            return Err(err);
        }
    };

    for kind in PluginKind::ALL {
        metrics.set_gauge(
            &["catalog", "plugins_loaded"],
            catalog.count(kind) as f64,
            &[Label::new("kind", kind.to_string())],
        );
    }
    info!(
        node_attestors = ?catalog.node_attestor_names(),
        node_resolvers = ?catalog.node_resolver_names(),
        upstream_authority = catalog.upstream_authority().is_some(),
        notifiers = catalog.notifiers().len(),
        "plugin catalog loaded"
    );

    Ok(Repository { catalog, closer })
}
