// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory datastore with the same error semantics as the SQL store.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use keystone_core::types::{AttestedNode, Bundle, Selector};
use keystone_core::{DataStore, GlobalConfig, KeystoneError, Plugin, PluginKind};

#[derive(Default)]
struct Tables {
    bundles: BTreeMap<String, Bundle>,
    nodes: BTreeMap<String, AttestedNode>,
    selectors: BTreeMap<String, Vec<Selector>>,
}

/// A datastore backed by `BTreeMap`s.
///
/// Counts calls to `fetch_bundle` and can delay them, so cache behaviour is
/// observable from tests.
#[derive(Default)]
pub struct MemoryDataStore {
    tables: Mutex<Tables>,
    bundle_fetches: AtomicUsize,
    fetch_delay: Mutex<Duration>,
    configures: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `fetch_bundle` calls that reached this store.
    pub fn bundle_fetches(&self) -> usize {
        self.bundle_fetches.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `fetch_bundle` sleep for `delay` first.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn configures(&self) -> usize {
        self.configures.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for MemoryDataStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn kind(&self) -> PluginKind {
        PluginKind::DataStore
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        _data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        self.configures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn create_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.bundles.contains_key(&bundle.trust_domain_id) {
            return Err(KeystoneError::AlreadyExists(format!(
                "bundle for {}",
                bundle.trust_domain_id
            )));
        }
        tables
            .bundles
            .insert(bundle.trust_domain_id.clone(), bundle.clone());
        Ok(())
    }

    async fn fetch_bundle(&self, trust_domain_id: &str) -> Result<Option<Bundle>, KeystoneError> {
        self.bundle_fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.tables.lock().unwrap().bundles.get(trust_domain_id).cloned())
    }

    async fn list_bundles(&self) -> Result<Vec<Bundle>, KeystoneError> {
        Ok(self.tables.lock().unwrap().bundles.values().cloned().collect())
    }

    async fn update_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.bundles.get_mut(&bundle.trust_domain_id) {
            Some(stored) => {
                *stored = bundle.clone();
                Ok(())
            }
            None => Err(KeystoneError::NotFound(format!(
                "bundle for {}",
                bundle.trust_domain_id
            ))),
        }
    }

    async fn append_bundle(&self, bundle: &Bundle) -> Result<Bundle, KeystoneError> {
        let mut tables = self.tables.lock().unwrap();
        let stored = tables
            .bundles
            .entry(bundle.trust_domain_id.clone())
            .or_insert_with(|| Bundle::new(bundle.trust_domain_id.clone()));
        stored.append(bundle);
        Ok(stored.clone())
    }

    async fn delete_bundle(&self, trust_domain_id: &str) -> Result<(), KeystoneError> {
        self.tables
            .lock()
            .unwrap()
            .bundles
            .remove(trust_domain_id)
            .map(|_| ())
            .ok_or_else(|| KeystoneError::NotFound(format!("bundle for {trust_domain_id}")))
    }

    async fn create_attested_node(&self, node: &AttestedNode) -> Result<(), KeystoneError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.nodes.contains_key(&node.spiffe_id) {
            return Err(KeystoneError::AlreadyExists(format!(
                "attested node {}",
                node.spiffe_id
            )));
        }
        tables.nodes.insert(node.spiffe_id.clone(), node.clone());
        Ok(())
    }

    async fn fetch_attested_node(
        &self,
        spiffe_id: &str,
    ) -> Result<Option<AttestedNode>, KeystoneError> {
        Ok(self.tables.lock().unwrap().nodes.get(spiffe_id).cloned())
    }

    async fn list_attested_nodes(&self) -> Result<Vec<AttestedNode>, KeystoneError> {
        Ok(self.tables.lock().unwrap().nodes.values().cloned().collect())
    }

    async fn delete_attested_node(&self, spiffe_id: &str) -> Result<AttestedNode, KeystoneError> {
        let mut tables = self.tables.lock().unwrap();
        let node = tables
            .nodes
            .remove(spiffe_id)
            .ok_or_else(|| KeystoneError::NotFound(format!("attested node {spiffe_id}")))?;
        tables.selectors.remove(spiffe_id);
        Ok(node)
    }

    async fn set_node_selectors(
        &self,
        spiffe_id: &str,
        selectors: &[Selector],
    ) -> Result<(), KeystoneError> {
        let mut sorted = selectors.to_vec();
        sorted.sort();
        sorted.dedup();
        self.tables
            .lock()
            .unwrap()
            .selectors
            .insert(spiffe_id.to_string(), sorted);
        Ok(())
    }

    async fn get_node_selectors(&self, spiffe_id: &str) -> Result<Vec<Selector>, KeystoneError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .selectors
            .get(spiffe_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mirrors_sql_error_semantics() {
        let ds = MemoryDataStore::new();
        let bundle = Bundle::new("spiffe://example.org");
        ds.create_bundle(&bundle).await.unwrap();
        assert!(matches!(
            ds.create_bundle(&bundle).await,
            Err(KeystoneError::AlreadyExists(_))
        ));
        assert!(matches!(
            ds.update_bundle(&Bundle::new("spiffe://other.org")).await,
            Err(KeystoneError::NotFound(_))
        ));
        assert!(matches!(
            ds.delete_attested_node("spiffe://example.org/a").await,
            Err(KeystoneError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_fetches_are_counted() {
        let ds = MemoryDataStore::new();
        ds.append_bundle(&Bundle::new("spiffe://example.org"))
            .await
            .unwrap();
        ds.list_bundles().await.unwrap();
        ds.fetch_bundle("spiffe://example.org").await.unwrap();
        assert_eq!(ds.bundle_fetches(), 1);
    }
}
