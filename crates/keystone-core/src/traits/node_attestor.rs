// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Node attestor trait for verifying agent attestation evidence.

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::traits::plugin::Plugin;
use crate::types::{AttestationRequest, AttestationResult};

/// Verifies the evidence an agent presents and issues its identity.
#[async_trait]
pub trait NodeAttestor: Plugin {
    async fn attest(&self, request: &AttestationRequest)
    -> Result<AttestationResult, KeystoneError>;
}
