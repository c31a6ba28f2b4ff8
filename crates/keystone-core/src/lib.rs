// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Keystone trust server.
//!
//! Defines the plugin traits every subsystem implements, the descriptors for
//! built-in plugins, the shared error type, and the domain types passed
//! between the catalog and its plugins.

pub mod builtin;
pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

pub use builtin::{BuiltIn, PluginFactory};
pub use clock::{Clock, SystemClock};
pub use error::{BoxError, ErrorCategory, KeystoneError};
pub use types::{GlobalConfig, PluginKind};

pub use traits::{
    AgentStore, DataStore, HostServices, IdentityProvider, KeyManager, MetricsService,
    NodeAttestor, NodeResolver, Notifier, Plugin, UpstreamAuthority,
};
