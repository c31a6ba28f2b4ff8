// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `disk` key manager.
//!
//! Keys live in memory and are written to `keys_path` as JSON, one hex seed
//! per key ID, after every change. Existing keys are reloaded at configure.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use keystone_core::types::{GlobalConfig, KeyType, PluginKind, PublicKey};
use keystone_core::{KeyManager, KeystoneError, Plugin};

use super::KeyRing;
use crate::parse_plugin_data;

pub const PLUGIN_NAME: &str = "disk";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    keys_path: PathBuf,
}

#[derive(Default, Serialize, Deserialize)]
struct KeysFile {
    keys: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    ring: KeyRing,
    path: Option<PathBuf>,
}

#[derive(Default)]
pub struct DiskKeyManager {
    state: Mutex<State>,
}

pub fn new_plugin() -> Arc<dyn KeyManager> {
    Arc::new(DiskKeyManager::default())
}

fn plugin_error(message: impl Into<String>) -> KeystoneError {
    KeystoneError::plugin(PluginKind::KeyManager, PLUGIN_NAME, message)
}

async fn load_keys(path: &Path) -> Result<KeyRing, KeystoneError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KeyRing::default()),
        Err(e) => return Err(plugin_error(format!("reading {}: {e}", path.display()))),
    };
    let file: KeysFile = serde_json::from_str(&content)
        .map_err(|e| plugin_error(format!("parsing {}: {e}", path.display())))?;
    KeyRing::from_seeds(PLUGIN_NAME, &file.keys)
}

async fn store_keys(path: &Path, ring: &KeyRing) -> Result<(), KeystoneError> {
    let file = KeysFile {
        keys: ring.to_seeds(),
    };
    let json = serde_json::to_vec_pretty(&file)
        .map_err(|e| plugin_error(format!("encoding keys: {e}")))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| plugin_error(format!("writing {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| plugin_error(format!("replacing {}: {e}", path.display())))?;
    debug!(path = %path.display(), "keys persisted");
    Ok(())
}

#[async_trait]
impl Plugin for DiskKeyManager {
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
        let config: Config = parse_plugin_data(PLUGIN_NAME, data)?;
        let ring = load_keys(&config.keys_path).await?;
        info!(path = %config.keys_path.display(), keys = ring.all().len(), "disk key manager loaded");

        let mut state = self.state.lock().await;
        state.ring = ring;
        state.path = Some(config.keys_path);
        Ok(())
    }
}

#[async_trait]
impl KeyManager for DiskKeyManager {
    async fn generate_key(
        &self,
        key_id: &str,
        key_type: KeyType,
    ) -> Result<PublicKey, KeystoneError> {
        let mut state = self.state.lock().await;
        let path = state
            .path
            .clone()
            .ok_or_else(|| plugin_error("not configured"))?;
        let public = state.ring.generate(key_id, key_type)?;
        store_keys(&path, &state.ring).await?;
        Ok(public)
    }

    async fn get_public_key(&self, key_id: &str) -> Result<Option<PublicKey>, KeystoneError> {
        Ok(self.state.lock().await.ring.get(key_id))
    }

    async fn get_public_keys(&self) -> Result<Vec<PublicKey>, KeystoneError> {
        Ok(self.state.lock().await.ring.all())
    }

    async fn sign_data(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, KeystoneError> {
        self.state.lock().await.ring.sign(key_id, data)
    }
}
