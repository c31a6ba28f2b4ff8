// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic plugin loading.
//!
//! A [`Loader`] resolves every configured plugin entry to an implementation,
//! configures it, and hands back the plugins grouped by kind together with a
//! [`Closer`] that shuts them down. [`BuiltinLoader`] resolves compiled-in
//! plugins only.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use keystone_config::{PluginConfigMap, PluginEntryConfig};
use keystone_core::{
    GlobalConfig, HostServices, KeyManager, KeystoneError, NodeAttestor, NodeResolver, Notifier,
    Plugin, PluginFactory, PluginKind, UpstreamAuthority,
};

use crate::builtins::BuiltInRegistry;
use crate::closer::Closer;

/// Everything a loader needs to fill the catalog's plugin slots.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub global: GlobalConfig,
    pub builtins: Arc<BuiltInRegistry>,
    /// Kinds the loader may fill, in load order.
    pub known_kinds: Vec<PluginKind>,
    /// Plugin configuration with the `DataStore` entry already removed.
    pub plugin_config: PluginConfigMap,
    pub host_services: HostServices,
}

/// Loader output, one slot per plugin kind.
#[derive(Clone)]
pub struct LoadedPlugins {
    pub node_attestors: Vec<Arc<dyn NodeAttestor>>,
    pub node_resolvers: Vec<Arc<dyn NodeResolver>>,
    pub upstream_authority: Option<Arc<dyn UpstreamAuthority>>,
    pub key_manager: Arc<dyn KeyManager>,
    /// Notifiers in load order.
    pub notifiers: Vec<Arc<dyn Notifier>>,
}

impl std::fmt::Debug for LoadedPlugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |plugins: Vec<&str>| plugins.join(", ");
        f.debug_struct("LoadedPlugins")
            .field(
                "node_attestors",
                &names(self.node_attestors.iter().map(|p| p.name()).collect()),
            )
            .field(
                "node_resolvers",
                &names(self.node_resolvers.iter().map(|p| p.name()).collect()),
            )
            .field(
                "upstream_authority",
                &self.upstream_authority.as_ref().map(|p| p.name()),
            )
            .field("key_manager", &self.key_manager.name())
            .field(
                "notifiers",
                &names(self.notifiers.iter().map(|p| p.name()).collect()),
            )
            .finish()
    }
}

/// Fills the catalog's plugin slots from configuration.
///
/// On error the loader must have released everything it created.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn fill(&self, config: LoaderConfig) -> Result<(LoadedPlugins, Closer), KeystoneError>;
}

/// Loads compiled-in plugins only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader;

#[async_trait]
impl Loader for BuiltinLoader {
    async fn fill(&self, config: LoaderConfig) -> Result<(LoadedPlugins, Closer), KeystoneError> {
        let mut closer = Closer::new();
        match load_builtins(&config, &mut closer).await {
            Ok(loaded) => Ok((loaded, closer)),
            Err(err) => {
                if let Err(release_err) = closer.close().await {
                    warn!(error = %release_err, "failed to release partially loaded plugins");
                }
                Err(err)
            }
        }
    }
}

type KindEntries<'a> = BTreeMap<PluginKind, &'a BTreeMap<String, PluginEntryConfig>>;

fn entries_by_kind(config: &LoaderConfig) -> Result<KindEntries<'_>, KeystoneError> {
    let mut by_kind = BTreeMap::new();
    for (kind_name, entries) in &config.plugin_config {
        let kind = PluginKind::from_str(kind_name)
            .map_err(|_| KeystoneError::Loader(format!("unknown plugin type `{kind_name}`")))?;
        if !config.known_kinds.contains(&kind) {
            return Err(KeystoneError::Loader(format!(
                "plugin type `{kind}` cannot be loaded by the plugin loader"
            )));
        }
        by_kind.insert(kind, entries);
    }
    Ok(by_kind)
}

fn check_cardinality(by_kind: &KindEntries<'_>) -> Result<(), KeystoneError> {
    let enabled = |kind: PluginKind| {
        by_kind
            .get(&kind)
            .map_or(0, |entries| entries.values().filter(|e| e.is_enabled()).count())
    };

    match enabled(PluginKind::KeyManager) {
        0 => {
            return Err(KeystoneError::Loader(
                "expecting a KeyManager plugin".to_string(),
            ));
        }
        1 => {}
        _ => {
            return Err(KeystoneError::Loader(
                "only one KeyManager plugin is allowed".to_string(),
            ));
        }
    }
    if enabled(PluginKind::UpstreamAuthority) > 1 {
        return Err(KeystoneError::Loader(
            "only one UpstreamAuthority plugin is allowed".to_string(),
        ));
    }
    Ok(())
}

async fn start<P>(
    config: &LoaderConfig,
    closer: &mut Closer,
    plugin: &Arc<P>,
    kind: PluginKind,
    name: &str,
    entry: &PluginEntryConfig,
) -> Result<(), KeystoneError>
where
    P: Plugin + ?Sized,
{
    plugin.bind_host_services(&config.host_services);
    closer.push_shutdown(format!("{kind} `{name}`"), Arc::clone(plugin));

    plugin
        .configure(&config.global, &entry.plugin_data)
        .await
        .map_err(|e| KeystoneError::PluginConfigure {
            kind,
            name: name.to_string(),
            source: Box::new(e),
        })?;
    info!(%kind, name, "plugin configured");
    Ok(())
}

async fn load_builtins(
    config: &LoaderConfig,
    closer: &mut Closer,
) -> Result<LoadedPlugins, KeystoneError> {
    let by_kind = entries_by_kind(config)?;
    check_cardinality(&by_kind)?;

    let mut node_attestors = Vec::new();
    let mut node_resolvers = Vec::new();
    let mut upstream_authority = None;
    let mut key_manager = None;
    let mut notifiers = Vec::new();

    for kind in &config.known_kinds {
        let Some(entries) = by_kind.get(kind) else {
            continue;
        };
        for (name, entry) in entries.iter() {
            if !entry.is_enabled() {
                debug!(%kind, name, "plugin disabled; skipping");
                continue;
            }
            if entry.is_external() {
                return Err(KeystoneError::Loader(format!(
                    "{kind} plugin `{name}` sets plugin_cmd; externally hosted plugins are not supported"
                )));
            }
            let builtin = config.builtins.get(*kind, name).ok_or_else(|| {
                KeystoneError::Loader(format!("no built-in {kind} plugin named `{name}`"))
            })?;

            match builtin.factory {
                PluginFactory::NodeAttestor(new_plugin) => {
                    let plugin = new_plugin();
                    start(config, closer, &plugin, *kind, name, entry).await?;
                    node_attestors.push(plugin);
                }
                PluginFactory::NodeResolver(new_plugin) => {
                    let plugin = new_plugin();
                    start(config, closer, &plugin, *kind, name, entry).await?;
                    node_resolvers.push(plugin);
                }
                PluginFactory::UpstreamAuthority(new_plugin) => {
                    let plugin = new_plugin();
                    start(config, closer, &plugin, *kind, name, entry).await?;
                    upstream_authority = Some(plugin);
                }
                PluginFactory::KeyManager(new_plugin) => {
                    let plugin = new_plugin();
                    start(config, closer, &plugin, *kind, name, entry).await?;
                    key_manager = Some(plugin);
                }
                PluginFactory::Notifier(new_plugin) => {
                    let plugin = new_plugin();
                    start(config, closer, &plugin, *kind, name, entry).await?;
                    notifiers.push(plugin);
                }
            }
        }
    }

    let key_manager = key_manager
        .ok_or_else(|| KeystoneError::Loader("expecting a KeyManager plugin".to_string()))?;

    Ok(LoadedPlugins {
        node_attestors,
        node_resolvers,
        upstream_authority,
        key_manager,
        notifiers,
    })
}
