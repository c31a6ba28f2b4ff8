// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait for propagating bundle changes to external systems.

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::traits::plugin::Plugin;
use crate::types::NotifierEvent;

/// Receives server events, typically bundle changes.
#[async_trait]
pub trait Notifier: Plugin {
    /// Delivers an event. Failures are reported but do not affect the caller.
    async fn notify(&self, event: &NotifierEvent) -> Result<(), KeystoneError>;

    /// Delivers an event whose failure the caller acts upon.
    async fn notify_and_advise(&self, event: &NotifierEvent) -> Result<(), KeystoneError>;
}
