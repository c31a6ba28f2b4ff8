// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `noop` node resolver: resolves no selectors for any agent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use keystone_core::types::{GlobalConfig, PluginKind, Selector};
use keystone_core::{KeystoneError, NodeResolver, Plugin};

pub const PLUGIN_NAME: &str = "noop";

#[derive(Debug, Default)]
pub struct NoopResolver;

pub fn new_plugin() -> Arc<dyn NodeResolver> {
    Arc::new(NoopResolver)
}

#[async_trait]
impl Plugin for NoopResolver {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::NodeResolver
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        _data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        Ok(())
    }
}

#[async_trait]
impl NodeResolver for NoopResolver {
    async fn resolve(
        &self,
        _agent_ids: &[String],
    ) -> Result<HashMap<String, Vec<Selector>>, KeystoneError> {
        Ok(HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_nothing() {
        let resolved = NoopResolver
            .resolve(&["spiffe://example.org/agent".to_string()])
            .await
            .unwrap();
        assert!(resolved.is_empty());
    }
}
