// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in plugins compiled into the Keystone server.
//!
//! [`builtins`] lists every implementation with its kind, name, and factory.
//! The catalog indexes the list and instantiates entries on demand; nothing
//! here is created until a configuration names it.

pub mod keymanager;
pub mod nodeattestor;
pub mod noderesolver;
pub mod notifier;
pub mod upstreamauthority;

use keystone_core::{BuiltIn, KeystoneError, PluginFactory};
use serde::de::DeserializeOwned;

/// Every built-in plugin.
pub fn builtins() -> Vec<BuiltIn> {
    vec![
        BuiltIn {
            name: nodeattestor::join_token::PLUGIN_NAME,
            description: "Attests agents presenting a pre-shared, single-use join token",
            factory: PluginFactory::NodeAttestor(nodeattestor::join_token::new_plugin),
        },
        BuiltIn {
            name: noderesolver::noop::PLUGIN_NAME,
            description: "Resolves no additional selectors",
            factory: PluginFactory::NodeResolver(noderesolver::noop::new_plugin),
        },
        BuiltIn {
            name: upstreamauthority::disk::PLUGIN_NAME,
            description: "Signs the server CA with an Ed25519 key read from disk",
            factory: PluginFactory::UpstreamAuthority(upstreamauthority::disk::new_plugin),
        },
        BuiltIn {
            name: keymanager::memory::PLUGIN_NAME,
            description: "Keeps Ed25519 keys in memory; keys are lost on restart",
            factory: PluginFactory::KeyManager(keymanager::memory::new_plugin),
        },
        BuiltIn {
            name: keymanager::disk::PLUGIN_NAME,
            description: "Keeps Ed25519 keys in a JSON file",
            factory: PluginFactory::KeyManager(keymanager::disk::new_plugin),
        },
        BuiltIn {
            name: notifier::bundle_file::PLUGIN_NAME,
            description: "Writes the trust bundle to a file when it changes",
            factory: PluginFactory::Notifier(notifier::bundle_file::new_plugin),
        },
    ]
}

/// Deserialize a plugin's `plugin_data`. A missing table reads as `{}`.
pub(crate) fn parse_plugin_data<T: DeserializeOwned>(
    plugin: &str,
    data: &serde_json::Value,
) -> Result<T, KeystoneError> {
    let data = match data {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(data)
        .map_err(|e| KeystoneError::InvalidArgument(format!("{plugin} plugin_data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{Plugin, PluginKind};
    use std::collections::HashSet;

    #[test]
    fn builtin_names_are_unique_per_kind() {
        let all = builtins();
        let keys: HashSet<(PluginKind, &str)> = all.iter().map(|b| (b.kind(), b.name)).collect();
        assert_eq!(keys.len(), all.len());
    }

    #[test]
    fn no_builtin_datastore_is_listed() {
        assert!(builtins().iter().all(|b| b.kind() != PluginKind::DataStore));
    }

    #[test]
    fn factories_produce_plugins_named_after_their_descriptor() {
        for builtin in builtins() {
            let (kind, name) = match builtin.factory {
                PluginFactory::NodeAttestor(new) => {
                    let p = new();
                    (p.kind(), p.name().to_string())
                }
                PluginFactory::NodeResolver(new) => {
                    let p = new();
                    (p.kind(), p.name().to_string())
                }
                PluginFactory::UpstreamAuthority(new) => {
                    let p = new();
                    (p.kind(), p.name().to_string())
                }
                PluginFactory::KeyManager(new) => {
                    let p = new();
                    (p.kind(), p.name().to_string())
                }
                PluginFactory::Notifier(new) => {
                    let p = new();
                    (p.kind(), p.name().to_string())
                }
            };
            assert_eq!(kind, builtin.kind());
            assert_eq!(name, builtin.name);
        }
    }

    #[test]
    fn null_plugin_data_reads_as_empty_table() {
        #[derive(serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Empty {}
        assert!(parse_plugin_data::<Empty>("test", &serde_json::Value::Null).is_ok());
        assert!(parse_plugin_data::<Empty>("test", &serde_json::json!({"x": 1})).is_err());
    }
}
