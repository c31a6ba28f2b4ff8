// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream authority trait for chaining the server CA to an external root.

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::traits::plugin::Plugin;
use crate::types::{CaSigningRequest, JwtKey, SignedCa};

/// An external authority that signs the server's CA and publishes JWT keys.
#[async_trait]
pub trait UpstreamAuthority: Plugin {
    /// Signs the server's CA key.
    async fn mint_ca(&self, request: &CaSigningRequest) -> Result<SignedCa, KeystoneError>;

    /// Publishes a JWT signing key upstream and returns the full upstream key set.
    async fn publish_jwt_key(&self, key: &JwtKey) -> Result<Vec<JwtKey>, KeystoneError>;
}
