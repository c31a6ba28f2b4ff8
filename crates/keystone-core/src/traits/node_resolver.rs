// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Node resolver trait for enriching attested agents with selectors.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::traits::plugin::Plugin;
use crate::types::Selector;

/// Resolves additional selectors for already attested agents.
#[async_trait]
pub trait NodeResolver: Plugin {
    /// Returns selectors keyed by agent ID. Agents without selectors may be omitted.
    async fn resolve(
        &self,
        agent_ids: &[String],
    ) -> Result<HashMap<String, Vec<Selector>>, KeystoneError>;
}
