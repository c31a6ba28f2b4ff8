// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `disk` upstream authority.
//!
//! Signs downstream CA keys with an Ed25519 key whose hex-encoded seed is read
//! from `key_file_path`. The signature covers [`ca_signing_payload`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::Deserialize;
use tracing::info;

use keystone_core::types::{CaSigningRequest, GlobalConfig, JwtKey, PluginKind, SignedCa};
use keystone_core::{Clock, KeystoneError, Plugin, SystemClock, UpstreamAuthority};

use crate::keymanager::signing_key_from_hex;
use crate::parse_plugin_data;

pub const PLUGIN_NAME: &str = "disk";

const DEFAULT_CA_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    key_file_path: PathBuf,
    #[serde(default = "default_ttl")]
    ca_ttl_secs: u64,
}

fn default_ttl() -> u64 {
    DEFAULT_CA_TTL_SECS
}

struct UpstreamKey {
    key: SigningKey,
    ca_ttl_secs: u64,
}

pub struct DiskUpstreamAuthority {
    signer: RwLock<Option<UpstreamKey>>,
    jwt_keys: Mutex<Vec<JwtKey>>,
    clock: Arc<dyn Clock>,
}

impl Default for DiskUpstreamAuthority {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

pub fn new_plugin() -> Arc<dyn UpstreamAuthority> {
    Arc::new(DiskUpstreamAuthority::default())
}

/// The bytes signed for a downstream CA: the public key followed by the
/// big-endian expiry.
pub fn ca_signing_payload(public_key: &[u8], not_after: i64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(public_key.len() + 8);
    payload.extend_from_slice(public_key);
    payload.extend_from_slice(&not_after.to_be_bytes());
    payload
}

fn upstream_error(message: impl Into<String>) -> KeystoneError {
    KeystoneError::plugin(PluginKind::UpstreamAuthority, PLUGIN_NAME, message)
}

impl DiskUpstreamAuthority {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: RwLock::new(None),
            jwt_keys: Mutex::new(Vec::new()),
            clock,
        }
    }
}

#[async_trait]
impl Plugin for DiskUpstreamAuthority {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::UpstreamAuthority
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        let config: Config = parse_plugin_data(PLUGIN_NAME, data)?;
        if i64::try_from(config.ca_ttl_secs).is_err() {
            return Err(KeystoneError::InvalidArgument(format!(
                "ca_ttl_secs {} is out of range",
                config.ca_ttl_secs
            )));
        }
        let seed = tokio::fs::read_to_string(&config.key_file_path)
            .await
            .map_err(|e| {
                KeystoneError::InvalidArgument(format!(
                    "reading {}: {e}",
                    config.key_file_path.display()
                ))
            })?;
        let key = signing_key_from_hex(&seed).map_err(|message| {
            KeystoneError::InvalidArgument(format!(
                "{}: {message}",
                config.key_file_path.display()
            ))
        })?;
        info!(
            path = %config.key_file_path.display(),
            root = %hex::encode(VerifyingKey::from(&key).to_bytes()),
            "upstream signing key loaded"
        );

        *self
            .signer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(UpstreamKey {
            key,
            ca_ttl_secs: config.ca_ttl_secs,
        });
        Ok(())
    }
}

#[async_trait]
impl UpstreamAuthority for DiskUpstreamAuthority {
    async fn mint_ca(&self, request: &CaSigningRequest) -> Result<SignedCa, KeystoneError> {
        let guard = self
            .signer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let signer = guard
            .as_ref()
            .ok_or_else(|| upstream_error("not configured"))?;

        let ttl = match request.preferred_ttl_secs {
            0 => signer.ca_ttl_secs,
            preferred => preferred.min(signer.ca_ttl_secs),
        };
        let not_after = i64::try_from(ttl)
            .ok()
            .and_then(|ttl| self.clock.unix_now().checked_add(ttl))
            .ok_or_else(|| {
                KeystoneError::InvalidArgument(format!("CA TTL of {ttl}s is out of range"))
            })?;
        let payload = ca_signing_payload(&request.public_key.bytes, not_after);

        Ok(SignedCa {
            public_key: request.public_key.clone(),
            not_after,
            signature: signer.key.sign(&payload).to_bytes().to_vec(),
            upstream_roots: vec![VerifyingKey::from(&signer.key).to_bytes().to_vec()],
        })
    }

    async fn publish_jwt_key(&self, key: &JwtKey) -> Result<Vec<JwtKey>, KeystoneError> {
        let mut keys = self
            .jwt_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.iter().any(|k| k.key_id == key.key_id) {
            keys.push(key.clone());
        }
        Ok(keys.clone())
    }
}
