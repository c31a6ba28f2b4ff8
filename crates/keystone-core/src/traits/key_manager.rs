// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key manager trait for server signing keys.

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::traits::plugin::Plugin;
use crate::types::{KeyType, PublicKey};

/// Generates and holds the server's private keys, exposing only public halves
/// and signatures.
#[async_trait]
pub trait KeyManager: Plugin {
    /// Generates (or replaces) the key stored under `key_id`.
    async fn generate_key(
        &self,
        key_id: &str,
        key_type: KeyType,
    ) -> Result<PublicKey, KeystoneError>;

    /// Returns the public key stored under `key_id`, `None` if there is none.
    async fn get_public_key(&self, key_id: &str) -> Result<Option<PublicKey>, KeystoneError>;

    /// Returns every public key, ordered by key ID.
    async fn get_public_keys(&self) -> Result<Vec<PublicKey>, KeystoneError>;

    /// Signs `data` with the key stored under `key_id`.
    async fn sign_data(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, KeystoneError>;
}
