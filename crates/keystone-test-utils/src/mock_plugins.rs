// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock plugins for every loader-managed kind.
//!
//! Each mock reports its lifecycle to a [`PluginProbe`]. Probes can be
//! shared between mocks so tests can assert on the relative order of
//! shutdowns across a whole catalog.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keystone_core::types::{
    AttestationRequest, AttestationResult, CaSigningRequest, JwtKey, KeyType, NotifierEvent,
    PublicKey, Selector, SignedCa,
};
use keystone_core::{
    GlobalConfig, HostServices, KeyManager, KeystoneError, NodeAttestor, NodeResolver, Notifier,
    Plugin, PluginKind, UpstreamAuthority,
};

/// Shared record of plugin lifecycle calls.
#[derive(Default)]
pub struct PluginProbe {
    configures: AtomicUsize,
    binds: AtomicUsize,
    fail_configure: AtomicBool,
    fail_shutdown: AtomicBool,
    shutdown_order: Mutex<Vec<String>>,
    events: Mutex<Vec<(String, NotifierEvent)>>,
    last_data: Mutex<Option<serde_json::Value>>,
}

impl PluginProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn configures(&self) -> usize {
        self.configures.load(Ordering::SeqCst)
    }

    pub fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdown_order.lock().unwrap().len()
    }

    /// Names of the plugins shut down so far, oldest first.
    pub fn shutdown_order(&self) -> Vec<String> {
        self.shutdown_order.lock().unwrap().clone()
    }

    /// Events received by notifiers, tagged with the notifier's name.
    pub fn events(&self) -> Vec<(String, NotifierEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// The `plugin_data` passed to the most recent configure call.
    pub fn last_data(&self) -> Option<serde_json::Value> {
        self.last_data.lock().unwrap().clone()
    }

    pub fn fail_configure(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::SeqCst);
    }

    pub fn fail_shutdown(&self, fail: bool) {
        self.fail_shutdown.store(fail, Ordering::SeqCst);
    }
}

struct Lifecycle {
    name: String,
    kind: PluginKind,
    probe: Arc<PluginProbe>,
}

impl Lifecycle {
    fn new(name: &str, kind: PluginKind, probe: Arc<PluginProbe>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            probe,
        }
    }

    fn bind(&self) {
        self.probe.binds.fetch_add(1, Ordering::SeqCst);
    }

    fn configure(&self, data: &serde_json::Value) -> Result<(), KeystoneError> {
        self.probe.configures.fetch_add(1, Ordering::SeqCst);
        *self.probe.last_data.lock().unwrap() = Some(data.clone());
        if self.probe.fail_configure.load(Ordering::SeqCst) {
            return Err(KeystoneError::InvalidArgument(format!(
                "{} rejected its configuration",
                self.name
            )));
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<(), KeystoneError> {
        self.probe
            .shutdown_order
            .lock()
            .unwrap()
            .push(self.name.clone());
        if self.probe.fail_shutdown.load(Ordering::SeqCst) {
            return Err(KeystoneError::plugin(self.kind, &self.name, "shutdown failed"));
        }
        Ok(())
    }
}

/// Attests any request whose type matches its name.
pub struct MockNodeAttestor {
    lifecycle: Lifecycle,
}

impl MockNodeAttestor {
    pub fn new(name: &str) -> Self {
        Self::with_probe(name, PluginProbe::new())
    }

    pub fn with_probe(name: &str, probe: Arc<PluginProbe>) -> Self {
        Self {
            lifecycle: Lifecycle::new(name, PluginKind::NodeAttestor, probe),
        }
    }
}

#[async_trait]
impl Plugin for MockNodeAttestor {
    fn name(&self) -> &str {
        &self.lifecycle.name
    }

    fn kind(&self) -> PluginKind {
        self.lifecycle.kind
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        self.lifecycle.configure(data)
    }

    fn bind_host_services(&self, _services: &HostServices) {
        self.lifecycle.bind();
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.lifecycle.shutdown()
    }
}

#[async_trait]
impl NodeAttestor for MockNodeAttestor {
    async fn attest(
        &self,
        request: &AttestationRequest,
    ) -> Result<AttestationResult, KeystoneError> {
        if request.attestation_type != self.lifecycle.name {
            return Err(KeystoneError::InvalidArgument(format!(
                "expected attestation type `{}`",
                self.lifecycle.name
            )));
        }
        let payload = String::from_utf8_lossy(&request.payload);
        Ok(AttestationResult {
            agent_id: format!(
                "spiffe://example.org/spire/agent/{}/{payload}",
                self.lifecycle.name
            ),
            selectors: vec![Selector::new(self.lifecycle.name.as_str(), payload)],
            can_reattest: true,
        })
    }
}

/// Resolves one `(name, agent_id)` selector per agent.
pub struct MockNodeResolver {
    lifecycle: Lifecycle,
}

impl MockNodeResolver {
    pub fn new(name: &str) -> Self {
        Self::with_probe(name, PluginProbe::new())
    }

    pub fn with_probe(name: &str, probe: Arc<PluginProbe>) -> Self {
        Self {
            lifecycle: Lifecycle::new(name, PluginKind::NodeResolver, probe),
        }
    }
}

#[async_trait]
impl Plugin for MockNodeResolver {
    fn name(&self) -> &str {
        &self.lifecycle.name
    }

    fn kind(&self) -> PluginKind {
        self.lifecycle.kind
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        self.lifecycle.configure(data)
    }

    fn bind_host_services(&self, _services: &HostServices) {
        self.lifecycle.bind();
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.lifecycle.shutdown()
    }
}

#[async_trait]
impl NodeResolver for MockNodeResolver {
    async fn resolve(
        &self,
        agent_ids: &[String],
    ) -> Result<HashMap<String, Vec<Selector>>, KeystoneError> {
        Ok(agent_ids
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    vec![Selector::new(self.lifecycle.name.as_str(), id.as_str())],
                )
            })
            .collect())
    }
}

/// Keeps fake key material in memory. Signatures are `key bytes ++ data`.
pub struct MockKeyManager {
    lifecycle: Lifecycle,
    keys: Mutex<BTreeMap<String, PublicKey>>,
}

impl MockKeyManager {
    pub fn new(name: &str) -> Self {
        Self::with_probe(name, PluginProbe::new())
    }

    pub fn with_probe(name: &str, probe: Arc<PluginProbe>) -> Self {
        Self {
            lifecycle: Lifecycle::new(name, PluginKind::KeyManager, probe),
            keys: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl Plugin for MockKeyManager {
    fn name(&self) -> &str {
        &self.lifecycle.name
    }

    fn kind(&self) -> PluginKind {
        self.lifecycle.kind
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        self.lifecycle.configure(data)
    }

    fn bind_host_services(&self, _services: &HostServices) {
        self.lifecycle.bind();
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.lifecycle.shutdown()
    }
}

#[async_trait]
impl KeyManager for MockKeyManager {
    async fn generate_key(
        &self,
        key_id: &str,
        key_type: KeyType,
    ) -> Result<PublicKey, KeystoneError> {
        let key = PublicKey {
            id: key_id.to_string(),
            key_type,
            bytes: format!("public:{key_id}").into_bytes(),
        };
        self.keys
            .lock()
            .unwrap()
            .insert(key_id.to_string(), key.clone());
        Ok(key)
    }

    async fn get_public_key(&self, key_id: &str) -> Result<Option<PublicKey>, KeystoneError> {
        Ok(self.keys.lock().unwrap().get(key_id).cloned())
    }

    async fn get_public_keys(&self) -> Result<Vec<PublicKey>, KeystoneError> {
        Ok(self.keys.lock().unwrap().values().cloned().collect())
    }

    async fn sign_data(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, KeystoneError> {
        let keys = self.keys.lock().unwrap();
        let key = keys
            .get(key_id)
            .ok_or_else(|| KeystoneError::NotFound(format!("key {key_id}")))?;
        let mut signature = key.bytes.clone();
        signature.extend_from_slice(data);
        Ok(signature)
    }
}

/// Signs CAs with a fixed root and remembers published JWT keys.
pub struct MockUpstreamAuthority {
    lifecycle: Lifecycle,
    jwt_keys: Mutex<Vec<JwtKey>>,
}

impl MockUpstreamAuthority {
    pub const ROOT: &'static [u8] = b"mock-upstream-root";

    pub fn new(name: &str) -> Self {
        Self::with_probe(name, PluginProbe::new())
    }

    pub fn with_probe(name: &str, probe: Arc<PluginProbe>) -> Self {
        Self {
            lifecycle: Lifecycle::new(name, PluginKind::UpstreamAuthority, probe),
            jwt_keys: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Plugin for MockUpstreamAuthority {
    fn name(&self) -> &str {
        &self.lifecycle.name
    }

    fn kind(&self) -> PluginKind {
        self.lifecycle.kind
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        self.lifecycle.configure(data)
    }

    fn bind_host_services(&self, _services: &HostServices) {
        self.lifecycle.bind();
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.lifecycle.shutdown()
    }
}

#[async_trait]
impl UpstreamAuthority for MockUpstreamAuthority {
    async fn mint_ca(&self, request: &CaSigningRequest) -> Result<SignedCa, KeystoneError> {
        let mut signature = Self::ROOT.to_vec();
        signature.extend_from_slice(&request.public_key.bytes);
        Ok(SignedCa {
            public_key: request.public_key.clone(),
            not_after: request.preferred_ttl_secs as i64,
            signature,
            upstream_roots: vec![Self::ROOT.to_vec()],
        })
    }

    async fn publish_jwt_key(&self, key: &JwtKey) -> Result<Vec<JwtKey>, KeystoneError> {
        let mut keys = self.jwt_keys.lock().unwrap();
        keys.push(key.clone());
        Ok(keys.clone())
    }
}

/// Records every event it receives on its probe.
pub struct MockNotifier {
    lifecycle: Lifecycle,
}

impl MockNotifier {
    pub fn new(name: &str) -> Self {
        Self::with_probe(name, PluginProbe::new())
    }

    pub fn with_probe(name: &str, probe: Arc<PluginProbe>) -> Self {
        Self {
            lifecycle: Lifecycle::new(name, PluginKind::Notifier, probe),
        }
    }

    pub fn probe(&self) -> Arc<PluginProbe> {
        Arc::clone(&self.lifecycle.probe)
    }

    fn record(&self, event: &NotifierEvent) {
        self.lifecycle
            .probe
            .events
            .lock()
            .unwrap()
            .push((self.lifecycle.name.clone(), event.clone()));
    }
}

#[async_trait]
impl Plugin for MockNotifier {
    fn name(&self) -> &str {
        &self.lifecycle.name
    }

    fn kind(&self) -> PluginKind {
        self.lifecycle.kind
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        self.lifecycle.configure(data)
    }

    fn bind_host_services(&self, _services: &HostServices) {
        self.lifecycle.bind();
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        self.lifecycle.shutdown()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, event: &NotifierEvent) -> Result<(), KeystoneError> {
        self.record(event);
        Ok(())
    }

    async fn notify_and_advise(&self, event: &NotifierEvent) -> Result<(), KeystoneError> {
        self.record(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shared_probe_tracks_lifecycle_across_plugins() {
        let probe = PluginProbe::new();
        let attestor = MockNodeAttestor::with_probe("a", Arc::clone(&probe));
        let notifier = MockNotifier::with_probe("n", Arc::clone(&probe));
        let global = GlobalConfig {
            trust_domain: "example.org".into(),
        };

        attestor
            .configure(&global, &serde_json::json!({"k": 1}))
            .await
            .unwrap();
        notifier.notify(&NotifierEvent::BundleUpdated).await.unwrap();
        notifier.shutdown().await.unwrap();
        attestor.shutdown().await.unwrap();

        assert_eq!(probe.configures(), 1);
        assert_eq!(probe.last_data(), Some(serde_json::json!({"k": 1})));
        assert_eq!(probe.shutdown_order(), vec!["n", "a"]);
        assert_eq!(
            probe.events(),
            vec![("n".to_string(), NotifierEvent::BundleUpdated)]
        );
    }

    #[tokio::test]
    async fn configure_failure_is_reported() {
        let km = MockKeyManager::new("memory");
        km.lifecycle.probe.fail_configure(true);
        let global = GlobalConfig {
            trust_domain: "example.org".into(),
        };
        assert!(km.configure(&global, &serde_json::Value::Null).await.is_err());
    }
}
