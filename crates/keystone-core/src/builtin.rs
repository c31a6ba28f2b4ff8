// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptors for plugins compiled into the server binary.

use std::sync::Arc;

use crate::traits::{KeyManager, NodeAttestor, NodeResolver, Notifier, UpstreamAuthority};
use crate::types::PluginKind;

/// Constructor for an unconfigured in-process plugin instance.
///
/// One variant per loadable kind; the datastore is not loadable and has no
/// variant.
#[derive(Clone, Copy)]
pub enum PluginFactory {
    NodeAttestor(fn() -> Arc<dyn NodeAttestor>),
    NodeResolver(fn() -> Arc<dyn NodeResolver>),
    UpstreamAuthority(fn() -> Arc<dyn UpstreamAuthority>),
    KeyManager(fn() -> Arc<dyn KeyManager>),
    Notifier(fn() -> Arc<dyn Notifier>),
}

impl PluginFactory {
    /// The catalog slot instances from this factory fill.
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginFactory::NodeAttestor(_) => PluginKind::NodeAttestor,
            PluginFactory::NodeResolver(_) => PluginKind::NodeResolver,
            PluginFactory::UpstreamAuthority(_) => PluginKind::UpstreamAuthority,
            PluginFactory::KeyManager(_) => PluginKind::KeyManager,
            PluginFactory::Notifier(_) => PluginKind::Notifier,
        }
    }
}

/// A built-in plugin: its name, a short description, and its factory.
#[derive(Clone, Copy)]
pub struct BuiltIn {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: PluginFactory,
}

impl BuiltIn {
    pub fn kind(&self) -> PluginKind {
        self.factory.kind()
    }
}

impl std::fmt::Debug for BuiltIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltIn")
            .field("kind", &self.kind())
            .field("name", &self.name)
            .finish()
    }
}
