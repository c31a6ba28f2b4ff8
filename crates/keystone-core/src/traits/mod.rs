// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin trait definitions for the Keystone catalog.
//!
//! Every subsystem extends the [`Plugin`] base trait and uses
//! `#[async_trait]` so it can be held as `Arc<dyn Trait>`.

pub mod datastore;
pub mod host;
pub mod key_manager;
pub mod node_attestor;
pub mod node_resolver;
pub mod notifier;
pub mod plugin;
pub mod upstream_authority;

pub use datastore::DataStore;
pub use host::{AgentStore, HostServices, IdentityProvider, MetricsService};
pub use key_manager::KeyManager;
pub use node_attestor::NodeAttestor;
pub use node_resolver::NodeResolver;
pub use notifier::Notifier;
pub use plugin::Plugin;
pub use upstream_authority::UpstreamAuthority;
