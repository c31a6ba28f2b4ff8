// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of compiled-in plugin implementations.

use std::collections::BTreeMap;

use keystone_core::{BuiltIn, PluginKind};

/// Plugin kinds filled by the generic loader. The datastore is bootstrapped
/// separately and is never among them.
pub fn known_kinds() -> Vec<PluginKind> {
    PluginKind::ALL
        .into_iter()
        .filter(|kind| *kind != PluginKind::DataStore)
        .collect()
}

/// Built-in plugin descriptors keyed by `(kind, name)`.
#[derive(Debug, Clone, Default)]
pub struct BuiltInRegistry {
    entries: BTreeMap<(PluginKind, String), BuiltIn>,
}

impl BuiltInRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in. A later registration for the same `(kind, name)`
    /// replaces the earlier one.
    pub fn register(&mut self, builtin: BuiltIn) {
        let key = (builtin.kind(), builtin.name.to_string());
        if let Some(previous) = self.entries.insert(key, builtin) {
            tracing::warn!(
                kind = %previous.kind(),
                name = previous.name,
                "built-in plugin registered twice; keeping the last registration"
            );
        }
    }

    pub fn get(&self, kind: PluginKind, name: &str) -> Option<&BuiltIn> {
        self.entries.get(&(kind, name.to_string()))
    }

    /// Names of the built-ins for one kind, sorted.
    pub fn names(&self, kind: PluginKind) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Every built-in, sorted by kind then name.
    pub fn list_all(&self) -> Vec<&BuiltIn> {
        self.entries.values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<BuiltIn> for BuiltInRegistry {
    fn from_iter<I: IntoIterator<Item = BuiltIn>>(iter: I) -> Self {
        let mut registry = Self::new();
        for builtin in iter {
            registry.register(builtin);
        }
        registry
    }
}
