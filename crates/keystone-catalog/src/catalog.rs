// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin registry and its query surface.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use keystone_core::{
    DataStore, KeyManager, KeystoneError, NodeAttestor, NodeResolver, Notifier, Plugin,
    PluginKind, UpstreamAuthority,
};

use crate::loader::LoadedPlugins;

/// Read access to the loaded subsystems.
pub trait Catalog: Send + Sync {
    fn data_store(&self) -> Arc<dyn DataStore>;

    fn node_attestor_named(&self, name: &str) -> Option<Arc<dyn NodeAttestor>>;

    fn node_resolver_named(&self, name: &str) -> Option<Arc<dyn NodeResolver>>;

    fn key_manager(&self) -> Arc<dyn KeyManager>;

    /// Notifiers in load order.
    fn notifiers(&self) -> &[Arc<dyn Notifier>];

    fn upstream_authority(&self) -> Option<Arc<dyn UpstreamAuthority>>;

    /// Names of the loaded node attestors, sorted.
    fn node_attestor_names(&self) -> Vec<String>;

    /// Names of the loaded node resolvers, sorted.
    fn node_resolver_names(&self) -> Vec<String>;
}

/// Immutable registry of every loaded subsystem.
pub struct Plugins {
    data_store: Arc<dyn DataStore>,
    node_attestors: BTreeMap<String, Arc<dyn NodeAttestor>>,
    node_resolvers: BTreeMap<String, Arc<dyn NodeResolver>>,
    upstream_authority: Option<Arc<dyn UpstreamAuthority>>,
    key_manager: Arc<dyn KeyManager>,
    notifiers: Vec<Arc<dyn Notifier>>,
}

fn keyed_by_name<T: Plugin + ?Sized>(
    kind: PluginKind,
    plugins: Vec<Arc<T>>,
) -> Result<BTreeMap<String, Arc<T>>, KeystoneError> {
    let mut keyed = BTreeMap::new();
    for plugin in plugins {
        let name = plugin.name().to_string();
        match keyed.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(plugin);
            }
            Entry::Occupied(slot) => {
                return Err(KeystoneError::DuplicatePlugin {
                    kind,
                    name: slot.key().clone(),
                });
            }
        }
    }
    Ok(keyed)
}

impl Plugins {
    /// Reshape loader output into the registry.
    ///
    /// `data_store` and the key manager inside `loaded` are taken as given;
    /// decorate them first. Two attestors or two resolvers with the same name
    /// are rejected.
    pub fn from_loaded(
        data_store: Arc<dyn DataStore>,
        loaded: LoadedPlugins,
    ) -> Result<Self, KeystoneError> {
        Ok(Self {
            data_store,
            node_attestors: keyed_by_name(PluginKind::NodeAttestor, loaded.node_attestors)?,
            node_resolvers: keyed_by_name(PluginKind::NodeResolver, loaded.node_resolvers)?,
            upstream_authority: loaded.upstream_authority,
            key_manager: loaded.key_manager,
            notifiers: loaded.notifiers,
        })
    }

    /// Number of loaded plugins of `kind`.
    pub fn count(&self, kind: PluginKind) -> usize {
        match kind {
            PluginKind::DataStore | PluginKind::KeyManager => 1,
            PluginKind::NodeAttestor => self.node_attestors.len(),
            PluginKind::NodeResolver => self.node_resolvers.len(),
            PluginKind::UpstreamAuthority => usize::from(self.upstream_authority.is_some()),
            PluginKind::Notifier => self.notifiers.len(),
        }
    }
}

impl Catalog for Plugins {
    fn data_store(&self) -> Arc<dyn DataStore> {
        Arc::clone(&self.data_store)
    }

    fn node_attestor_named(&self, name: &str) -> Option<Arc<dyn NodeAttestor>> {
        self.node_attestors.get(name).cloned()
    }

    fn node_resolver_named(&self, name: &str) -> Option<Arc<dyn NodeResolver>> {
        self.node_resolvers.get(name).cloned()
    }

    fn key_manager(&self) -> Arc<dyn KeyManager> {
        Arc::clone(&self.key_manager)
    }

    fn notifiers(&self) -> &[Arc<dyn Notifier>] {
        &self.notifiers
    }

    fn upstream_authority(&self) -> Option<Arc<dyn UpstreamAuthority>> {
        self.upstream_authority.clone()
    }

    fn node_attestor_names(&self) -> Vec<String> {
        self.node_attestors.keys().cloned().collect()
    }

    fn node_resolver_names(&self) -> Vec<String> {
        self.node_resolvers.keys().cloned().collect()
    }
}
