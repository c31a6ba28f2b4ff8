// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the plugin traits and the catalog.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifies the kind of a plugin slot in the catalog.
///
/// The string form (`"NodeAttestor"`, ...) is the key used in the
/// `[plugins.<Kind>.<name>]` configuration tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
pub enum PluginKind {
    DataStore,
    NodeAttestor,
    NodeResolver,
    UpstreamAuthority,
    KeyManager,
    Notifier,
}

impl PluginKind {
    /// Every plugin kind, in catalog order.
    pub const ALL: [PluginKind; 6] = [
        PluginKind::DataStore,
        PluginKind::NodeAttestor,
        PluginKind::NodeResolver,
        PluginKind::UpstreamAuthority,
        PluginKind::KeyManager,
        PluginKind::Notifier,
    ];
}

/// Server-wide settings handed to every plugin at configure time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Trust domain served by this server, e.g. `example.org`.
    pub trust_domain: String,
}

impl GlobalConfig {
    /// The SPIFFE ID of the trust domain itself.
    pub fn trust_domain_id(&self) -> String {
        format!("spiffe://{}", self.trust_domain)
    }
}

/// A key/value property describing a node or workload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Selector {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Key algorithms understood by key managers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum KeyType {
    Ed25519,
}

/// Public half of a key held by a key manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub id: String,
    pub key_type: KeyType,
    pub bytes: Vec<u8>,
}

/// A JWT signing key published in a trust bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtKey {
    pub key_id: String,
    pub public_key: Vec<u8>,
    /// Expiry as unix seconds.
    pub not_after: i64,
}

/// Trust bundle for one trust domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// SPIFFE ID of the trust domain, e.g. `spiffe://example.org`.
    pub trust_domain_id: String,
    /// Root CA material, one opaque blob per root.
    #[serde(default)]
    pub root_cas: Vec<Vec<u8>>,
    #[serde(default)]
    pub jwt_signing_keys: Vec<JwtKey>,
    #[serde(default)]
    pub refresh_hint_secs: i64,
}

impl Bundle {
    pub fn new(trust_domain_id: impl Into<String>) -> Self {
        Self {
            trust_domain_id: trust_domain_id.into(),
            root_cas: Vec::new(),
            jwt_signing_keys: Vec::new(),
            refresh_hint_secs: 0,
        }
    }

    /// Merge the roots and JWT keys of `other` into `self`, skipping ones already present.
    pub fn append(&mut self, other: &Bundle) {
        for ca in &other.root_cas {
            if !self.root_cas.contains(ca) {
                self.root_cas.push(ca.clone());
            }
        }
        for key in &other.jwt_signing_keys {
            if !self
                .jwt_signing_keys
                .iter()
                .any(|k| k.key_id == key.key_id)
            {
                self.jwt_signing_keys.push(key.clone());
            }
        }
    }
}

/// An agent node that has completed attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedNode {
    pub spiffe_id: String,
    pub attestation_type: String,
    /// Expiry of the node's current credential as unix seconds.
    pub expires_at: i64,
    #[serde(default)]
    pub can_reattest: bool,
}

/// Attestation evidence presented by an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationRequest {
    pub attestation_type: String,
    pub payload: Vec<u8>,
}

/// Outcome of a successful attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationResult {
    pub agent_id: String,
    pub selectors: Vec<Selector>,
    pub can_reattest: bool,
}

/// Request for an upstream authority to sign a downstream CA key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaSigningRequest {
    pub public_key: PublicKey,
    /// Requested lifetime in seconds. Zero lets the authority choose.
    pub preferred_ttl_secs: u64,
}

/// A downstream CA key signed by an upstream authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCa {
    pub public_key: PublicKey,
    pub not_after: i64,
    pub signature: Vec<u8>,
    /// Upstream root keys that verify `signature`.
    pub upstream_roots: Vec<Vec<u8>>,
}

/// Events delivered to notifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// The server loaded its bundle at startup.
    BundleLoaded,
    /// The server's bundle changed.
    BundleUpdated,
}

/// What the agent store knows about an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInfo {
    pub agent_id: String,
    pub attestation_type: String,
    pub expires_at: i64,
}

/// A metric label attached by plugins or telemetry wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
