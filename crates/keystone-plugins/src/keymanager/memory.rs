// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `memory` key manager. Keys do not survive a restart.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;

use keystone_core::types::{GlobalConfig, KeyType, PluginKind, PublicKey};
use keystone_core::{KeyManager, KeystoneError, Plugin};

use super::KeyRing;
use crate::parse_plugin_data;

pub const PLUGIN_NAME: &str = "memory";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {}

#[derive(Default)]
pub struct MemoryKeyManager {
    ring: RwLock<KeyRing>,
}

pub fn new_plugin() -> Arc<dyn KeyManager> {
    Arc::new(MemoryKeyManager::default())
}

impl MemoryKeyManager {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, KeyRing> {
        self.ring.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Plugin for MemoryKeyManager {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::KeyManager
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        parse_plugin_data::<Config>(PLUGIN_NAME, data)?;
        Ok(())
    }
}

#[async_trait]
impl KeyManager for MemoryKeyManager {
    async fn generate_key(
        &self,
        key_id: &str,
        key_type: KeyType,
    ) -> Result<PublicKey, KeystoneError> {
        self.ring
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .generate(key_id, key_type)
    }

    async fn get_public_key(&self, key_id: &str) -> Result<Option<PublicKey>, KeystoneError> {
        Ok(self.read().get(key_id))
    }

    async fn get_public_keys(&self) -> Result<Vec<PublicKey>, KeystoneError> {
        Ok(self.read().all())
    }

    async fn sign_data(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, KeystoneError> {
        self.read().sign(key_id, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_replace_and_list() {
        let km = MemoryKeyManager::default();
        km.configure(
            &GlobalConfig {
                trust_domain: "example.org".into(),
            },
            &serde_json::Value::Null,
        )
        .await
        .unwrap();

        let first = km.generate_key("x509-CA-A", KeyType::Ed25519).await.unwrap();
        let second = km.generate_key("x509-CA-A", KeyType::Ed25519).await.unwrap();
        assert_ne!(first.bytes, second.bytes);

        km.generate_key("jwt-A", KeyType::Ed25519).await.unwrap();
        let ids: Vec<String> = km
            .get_public_keys()
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.id)
            .collect();
        assert_eq!(ids, vec!["jwt-A", "x509-CA-A"]);
        assert_eq!(km.get_public_key("x509-CA-A").await.unwrap(), Some(second));
        assert!(km.get_public_key("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_unknown_config() {
        let km = MemoryKeyManager::default();
        let err = km
            .configure(
                &GlobalConfig {
                    trust_domain: "example.org".into(),
                },
                &serde_json::json!({"keys_path": "/tmp/x"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KeystoneError::InvalidArgument(_)));
    }
}
