// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host services backed by the catalog's datastore.
//!
//! Plugins receive these before the datastore they read from exists, so each
//! service is created empty and bound to the datastore once the repository is
//! loaded. Calls before binding fail.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use keystone_core::types::{AgentInfo, Bundle};
use keystone_core::{AgentStore, DataStore, IdentityProvider, KeystoneError};

fn bind_once(
    slot: &OnceLock<Arc<dyn DataStore>>,
    data_store: Arc<dyn DataStore>,
    service: &str,
) -> Result<(), KeystoneError> {
    slot.set(data_store)
        .map_err(|_| KeystoneError::Internal(format!("{service} is already bound to a datastore")))
}

fn bound<'a>(
    slot: &'a OnceLock<Arc<dyn DataStore>>,
    service: &str,
) -> Result<&'a Arc<dyn DataStore>, KeystoneError> {
    slot.get()
        .ok_or_else(|| KeystoneError::Internal(format!("{service} is not bound to a datastore yet")))
}

/// Answers agent lookups from attested node records.
#[derive(Default)]
pub struct DataStoreAgentStore {
    data_store: OnceLock<Arc<dyn DataStore>>,
}

impl DataStoreAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, data_store: Arc<dyn DataStore>) -> Result<(), KeystoneError> {
        bind_once(&self.data_store, data_store, "agent store")
    }
}

#[async_trait]
impl AgentStore for DataStoreAgentStore {
    async fn get_agent_info(&self, agent_id: &str) -> Result<Option<AgentInfo>, KeystoneError> {
        let node = bound(&self.data_store, "agent store")?
            .fetch_attested_node(agent_id)
            .await?;
        Ok(node.map(|node| AgentInfo {
            agent_id: node.spiffe_id,
            attestation_type: node.attestation_type,
            expires_at: node.expires_at,
        }))
    }
}

/// Serves the trust domain's own bundle.
pub struct BundleIdentityProvider {
    trust_domain_id: String,
    data_store: OnceLock<Arc<dyn DataStore>>,
}

impl BundleIdentityProvider {
    pub fn new(trust_domain_id: impl Into<String>) -> Self {
        Self {
            trust_domain_id: trust_domain_id.into(),
            data_store: OnceLock::new(),
        }
    }

    pub fn bind(&self, data_store: Arc<dyn DataStore>) -> Result<(), KeystoneError> {
        bind_once(&self.data_store, data_store, "identity provider")
    }
}

#[async_trait]
impl IdentityProvider for BundleIdentityProvider {
    async fn fetch_bundle(&self) -> Result<Bundle, KeystoneError> {
        bound(&self.data_store, "identity provider")?
            .fetch_bundle(&self.trust_domain_id)
            .await?
            .ok_or_else(|| {
                KeystoneError::NotFound(format!("bundle for {}", self.trust_domain_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::types::AttestedNode;
    use keystone_test_utils::MemoryDataStore;

    #[tokio::test]
    async fn unbound_services_fail() {
        let agents = DataStoreAgentStore::new();
        assert!(agents.get_agent_info("spiffe://example.org/a").await.is_err());

        let identity = BundleIdentityProvider::new("spiffe://example.org");
        assert!(identity.fetch_bundle().await.is_err());
    }

    #[tokio::test]
    async fn bound_services_read_the_datastore() {
        let ds: Arc<dyn DataStore> = Arc::new(MemoryDataStore::new());
        ds.create_attested_node(&AttestedNode {
            spiffe_id: "spiffe://example.org/a".into(),
            attestation_type: "join_token".into(),
            expires_at: 42,
            can_reattest: false,
        })
        .await
        .unwrap();

        let agents = DataStoreAgentStore::new();
        agents.bind(Arc::clone(&ds)).unwrap();
        let info = agents
            .get_agent_info("spiffe://example.org/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.expires_at, 42);
        assert!(agents.get_agent_info("spiffe://example.org/b").await.unwrap().is_none());
        assert!(agents.bind(Arc::clone(&ds)).is_err());

        let identity = BundleIdentityProvider::new("spiffe://example.org");
        identity.bind(Arc::clone(&ds)).unwrap();
        assert!(matches!(
            identity.fetch_bundle().await.unwrap_err(),
            KeystoneError::NotFound(_)
        ));
        ds.create_bundle(&Bundle::new("spiffe://example.org")).await.unwrap();
        assert_eq!(
            identity.fetch_bundle().await.unwrap().trust_domain_id,
            "spiffe://example.org"
        );
    }
}
