// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metrics decorator for the key manager.

use std::sync::Arc;

use async_trait::async_trait;
use keystone_core::types::{GlobalConfig, KeyType, PluginKind, PublicKey};
use keystone_core::{KeyManager, KeystoneError, MetricsService, Plugin};

use crate::call::observe;

const SUBSYSTEM: &str = "key_manager";

/// Wraps a [`KeyManager`] and records a call counter for every operation.
pub struct MetricsKeyManager {
    inner: Arc<dyn KeyManager>,
    metrics: Arc<dyn MetricsService>,
}

impl MetricsKeyManager {
    pub fn wrap(
        inner: Arc<dyn KeyManager>,
        metrics: Arc<dyn MetricsService>,
    ) -> Arc<dyn KeyManager> {
        Arc::new(Self { inner, metrics })
    }
}

#[async_trait]
impl Plugin for MetricsKeyManager {
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
impl KeyManager for MetricsKeyManager {
    async fn generate_key(
        &self,
        key_id: &str,
        key_type: KeyType,
    ) -> Result<PublicKey, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "generate_key",
            self.inner.generate_key(key_id, key_type),
        )
        .await
    }

    async fn get_public_key(&self, key_id: &str) -> Result<Option<PublicKey>, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "get_public_key",
            self.inner.get_public_key(key_id),
        )
        .await
    }

    async fn get_public_keys(&self) -> Result<Vec<PublicKey>, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "get_public_keys",
            self.inner.get_public_keys(),
        )
        .await
    }

    async fn sign_data(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, KeystoneError> {
        observe(
            &self.metrics,
            SUBSYSTEM,
            "sign_data",
            self.inner.sign_data(key_id, data),
        )
        .await
    }
}
