// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metrics decorator for the datastore.

use std::sync::Arc;

use async_trait::async_trait;
use keystone_core::types::{AttestedNode, Bundle, GlobalConfig, PluginKind, Selector};
use keystone_core::{DataStore, KeystoneError, MetricsService, Plugin};

use crate::call::observe;

const SUBSYSTEM: &str = "datastore";

/// Wraps a [`DataStore`] and records a call counter for every operation.
pub struct MetricsDataStore {
    inner: Arc<dyn DataStore>,
    metrics: Arc<dyn MetricsService>,
}

impl MetricsDataStore {
    pub fn wrap(inner: Arc<dyn DataStore>, metrics: Arc<dyn MetricsService>) -> Arc<dyn DataStore> {
        Arc::new(Self { inner, metrics })
    }
}

#[async_trait]
impl Plugin for MetricsDataStore {
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
        self.inner.configure(global, data).await
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl DataStore for MetricsDataStore {
    async fn create_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        observe(&self.metrics, SUBSYSTEM, "create_bundle", self.inner.create_bundle(bundle)).await
    }

    async fn fetch_bundle(&self, trust_domain_id: &str) -> Result<Option<Bundle>, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "fetch_bundle",
            self.inner.fetch_bundle(trust_domain_id),
        )
        .await
    }

    async fn list_bundles(&self) -> Result<Vec<Bundle>, KeystoneError> {
        observe(&self.metrics, SUBSYSTEM, "list_bundles", self.inner.list_bundles()).await
    }

    async fn update_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        observe(&self.metrics, SUBSYSTEM, "update_bundle", self.inner.update_bundle(bundle)).await
    }

    async fn append_bundle(&self, bundle: &Bundle) -> Result<Bundle, KeystoneError> {
        observe(&self.metrics, SUBSYSTEM, "append_bundle", self.inner.append_bundle(bundle)).await
    }

    async fn delete_bundle(&self, trust_domain_id: &str) -> Result<(), KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "delete_bundle",
            self.inner.delete_bundle(trust_domain_id),
        )
        .await
    }

    async fn create_attested_node(&self, node: &AttestedNode) -> Result<(), KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "create_attested_node",
            self.inner.create_attested_node(node),
        )
        .await
    }

    async fn fetch_attested_node(
        &self,
        spiffe_id: &str,
    ) -> Result<Option<AttestedNode>, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "fetch_attested_node",
            self.inner.fetch_attested_node(spiffe_id),
        )
        .await
    }

    async fn list_attested_nodes(&self) -> Result<Vec<AttestedNode>, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "list_attested_nodes",
            self.inner.list_attested_nodes(),
        )
        .await
    }

    async fn delete_attested_node(&self, spiffe_id: &str) -> Result<AttestedNode, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "delete_attested_node",
            self.inner.delete_attested_node(spiffe_id),
        )
        .await
    }

    async fn set_node_selectors(
        &self,
        spiffe_id: &str,
        selectors: &[Selector],
    ) -> Result<(), KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "set_node_selectors",
            self.inner.set_node_selectors(spiffe_id, selectors),
        )
        .await
    }

    async fn get_node_selectors(&self, spiffe_id: &str) -> Result<Vec<Selector>, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "get_node_selectors",
            self.inner.get_node_selectors(spiffe_id),
        )
        .await
    }
}
