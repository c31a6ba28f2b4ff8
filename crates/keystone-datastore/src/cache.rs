// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived bundle cache in front of a datastore.
//!
//! Bundles are read on every agent and workload sync, so `fetch_bundle` results
//! are kept for [`BUNDLE_CACHE_TTL`]. Concurrent fetches for the same trust
//! domain share one call to the backing store. Bundle writes through this
//! wrapper drop the cached entry for that trust domain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::trace;

use keystone_core::types::{AttestedNode, Bundle, GlobalConfig, PluginKind, Selector};
use keystone_core::{Clock, DataStore, KeystoneError, Plugin};

/// How long a fetched bundle stays cached.
pub const BUNDLE_CACHE_TTL: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Entry {
    bundle: Option<Bundle>,
    fetched_at: Option<Instant>,
}

/// Wraps a [`DataStore`] with a per-trust-domain bundle cache.
pub struct CachedDataStore {
    inner: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    bundles: DashMap<String, Arc<Mutex<Entry>>>,
}

impl CachedDataStore {
    pub fn new(inner: Arc<dyn DataStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(inner, clock, BUNDLE_CACHE_TTL)
    }

    pub fn with_ttl(inner: Arc<dyn DataStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner,
            clock,
            ttl,
            bundles: DashMap::new(),
        }
    }

    fn entry(&self, trust_domain_id: &str) -> Arc<Mutex<Entry>> {
        self.bundles
            .entry(trust_domain_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn invalidate(&self, trust_domain_id: &str) {
        self.bundles.remove(trust_domain_id);
    }

    /// Drops a slot that holds nothing, unless a write already replaced it.
    fn release(&self, trust_domain_id: &str, slot: &Arc<Mutex<Entry>>) {
        self.bundles
            .remove_if(trust_domain_id, |_, current| Arc::ptr_eq(current, slot));
    }
}

#[async_trait]
impl Plugin for CachedDataStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> PluginKind {
        self.inner.kind()
    }

    async fn configure(
        &self,
        global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        self.bundles.clear();
        self.inner.configure(global, data).await
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.bundles.clear();
        self.inner.shutdown().await
    }
}

#[async_trait]
impl DataStore for CachedDataStore {
    async fn create_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        let result = self.inner.create_bundle(bundle).await;
        self.invalidate(&bundle.trust_domain_id);
        result
    }

    async fn fetch_bundle(&self, trust_domain_id: &str) -> Result<Option<Bundle>, KeystoneError> {
        let slot = self.entry(trust_domain_id);
        let mut entry = slot.lock().await;

        let now = self.clock.now();
        if let Some(fetched_at) = entry.fetched_at
            && now.saturating_duration_since(fetched_at) < self.ttl
        {
            trace!(trust_domain_id, "bundle cache hit");
            return Ok(entry.bundle.clone());
        }

        let fetched = self.inner.fetch_bundle(trust_domain_id).await;
        match &fetched {
            Ok(Some(bundle)) => {
                entry.bundle = Some(bundle.clone());
                entry.fetched_at = Some(now);
            }
            _ => {
                entry.bundle = None;
                entry.fetched_at = None;
                drop(entry);
                self.release(trust_domain_id, &slot);
            }
        }
        fetched
    }

    async fn list_bundles(&self) -> Result<Vec<Bundle>, KeystoneError> {
        self.inner.list_bundles().await
    }

    async fn update_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        let result = self.inner.update_bundle(bundle).await;
        self.invalidate(&bundle.trust_domain_id);
        result
    }

    async fn append_bundle(&self, bundle: &Bundle) -> Result<Bundle, KeystoneError> {
        let result = self.inner.append_bundle(bundle).await;
        self.invalidate(&bundle.trust_domain_id);
        result
    }

    async fn delete_bundle(&self, trust_domain_id: &str) -> Result<(), KeystoneError> {
        let result = self.inner.delete_bundle(trust_domain_id).await;
        self.invalidate(trust_domain_id);
        result
    }

    async fn create_attested_node(&self, node: &AttestedNode) -> Result<(), KeystoneError> {
        self.inner.create_attested_node(node).await
    }

    async fn fetch_attested_node(
        &self,
        spiffe_id: &str,
    ) -> Result<Option<AttestedNode>, KeystoneError> {
        self.inner.fetch_attested_node(spiffe_id).await
    }

    async fn list_attested_nodes(&self) -> Result<Vec<AttestedNode>, KeystoneError> {
        self.inner.list_attested_nodes().await
    }

    async fn delete_attested_node(&self, spiffe_id: &str) -> Result<AttestedNode, KeystoneError> {
        self.inner.delete_attested_node(spiffe_id).await
    }

    async fn set_node_selectors(
        &self,
        spiffe_id: &str,
        selectors: &[Selector],
    ) -> Result<(), KeystoneError> {
        self.inner.set_node_selectors(spiffe_id, selectors).await
    }

    async fn get_node_selectors(&self, spiffe_id: &str) -> Result<Vec<Selector>, KeystoneError> {
        self.inner.get_node_selectors(spiffe_id).await
    }
}
