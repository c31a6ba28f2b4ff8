// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ed25519 key managers.

pub mod disk;
pub mod memory;

use std::collections::BTreeMap;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use keystone_core::types::{KeyType, PublicKey};
use keystone_core::{KeystoneError, PluginKind};

/// Signing keys by key ID.
#[derive(Default)]
pub(crate) struct KeyRing {
    keys: BTreeMap<String, SigningKey>,
}

impl KeyRing {
    fn public_key(id: &str, key: &SigningKey) -> PublicKey {
        PublicKey {
            id: id.to_string(),
            key_type: KeyType::Ed25519,
            bytes: VerifyingKey::from(key).to_bytes().to_vec(),
        }
    }

    pub(crate) fn generate(&mut self, key_id: &str, key_type: KeyType) -> Result<PublicKey, KeystoneError> {
        if key_id.is_empty() {
            return Err(KeystoneError::InvalidArgument("key id is required".into()));
        }
        let key = match key_type {
            KeyType::Ed25519 => SigningKey::generate(&mut OsRng),
        };
        let public = Self::public_key(key_id, &key);
        self.keys.insert(key_id.to_string(), key);
        Ok(public)
    }

    pub(crate) fn get(&self, key_id: &str) -> Option<PublicKey> {
        self.keys.get(key_id).map(|key| Self::public_key(key_id, key))
    }

    pub(crate) fn all(&self) -> Vec<PublicKey> {
        self.keys
            .iter()
            .map(|(id, key)| Self::public_key(id, key))
            .collect()
    }

    pub(crate) fn sign(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, KeystoneError> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| KeystoneError::NotFound(format!("key `{key_id}`")))?;
        Ok(key.sign(data).to_bytes().to_vec())
    }

    /// Hex-encoded private seeds, for persistence.
    pub(crate) fn to_seeds(&self) -> BTreeMap<String, String> {
        self.keys
            .iter()
            .map(|(id, key)| (id.clone(), hex::encode(key.to_bytes())))
            .collect()
    }

    pub(crate) fn from_seeds(
        plugin: &str,
        seeds: &BTreeMap<String, String>,
    ) -> Result<Self, KeystoneError> {
        let mut keys = BTreeMap::new();
        for (id, seed) in seeds {
            let key = signing_key_from_hex(seed).map_err(|message| {
                KeystoneError::plugin(PluginKind::KeyManager, plugin, format!("key `{id}`: {message}"))
            })?;
            keys.insert(id.clone(), key);
        }
        Ok(Self { keys })
    }
}

/// Decode a hex-encoded 32-byte Ed25519 seed.
pub(crate) fn signing_key_from_hex(seed: &str) -> Result<SigningKey, String> {
    let bytes = hex::decode(seed.trim()).map_err(|e| format!("invalid hex seed: {e}"))?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("seed must be 32 bytes, got {}", b.len()))?;
    Ok(SigningKey::from_bytes(&seed))
}
