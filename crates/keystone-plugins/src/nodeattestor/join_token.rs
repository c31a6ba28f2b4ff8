// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `join_token` node attestor.
//!
//! Agents present one of the configured tokens. Each token attests exactly one
//! agent, `spiffe://<trust domain>/spire/agent/join_token/<token>`, and is
//! consumed on success.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use keystone_core::types::{
    AttestationRequest, AttestationResult, GlobalConfig, Label, PluginKind, Selector,
};
use keystone_core::{HostServices, KeystoneError, NodeAttestor, Plugin};

use crate::parse_plugin_data;

pub const PLUGIN_NAME: &str = "join_token";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    #[serde(default)]
    tokens: Vec<String>,
}

#[derive(Default)]
struct State {
    trust_domain: String,
    tokens: BTreeSet<String>,
}

#[derive(Default)]
pub struct JoinTokenAttestor {
    state: Mutex<Option<State>>,
    services: OnceLock<HostServices>,
}

pub fn new_plugin() -> Arc<dyn NodeAttestor> {
    Arc::new(JoinTokenAttestor::default())
}

fn attestation_error(message: impl Into<String>) -> KeystoneError {
    KeystoneError::plugin(PluginKind::NodeAttestor, PLUGIN_NAME, message)
}

impl JoinTokenAttestor {
    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, KeystoneError>,
    ) -> Result<T, KeystoneError> {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = guard
            .as_mut()
            .ok_or_else(|| attestation_error("not configured"))?;
        f(state)
    }

    fn count(&self, outcome: &str) {
        if let Some(services) = self.services.get() {
            services.metrics.incr_counter(
                &[PLUGIN_NAME, "attestations"],
                1,
                &[Label::new("outcome", outcome)],
            );
        }
    }

    async fn attest_token(&self, token: &str) -> Result<AttestationResult, KeystoneError> {
        let agent_id = self.with_state(|state| {
            if !state.tokens.contains(token) {
                return Err(attestation_error("unknown or already used join token"));
            }
            Ok(format!(
                "spiffe://{}/spire/agent/{PLUGIN_NAME}/{token}",
                state.trust_domain
            ))
        })?;

        let services = self
            .services
            .get()
            .ok_or_else(|| attestation_error("host services are not bound"))?;
        if services.agent_store.get_agent_info(&agent_id).await?.is_some() {
            return Err(attestation_error(format!(
                "agent {agent_id} has already attested"
            )));
        }

        self.with_state(|state| {
            if state.tokens.remove(token) {
                Ok(())
            } else {
                Err(attestation_error("unknown or already used join token"))
            }
        })?;
        info!(agent_id, "agent attested with join token");

        Ok(AttestationResult {
            agent_id,
            selectors: vec![Selector::new(PLUGIN_NAME, token)],
            can_reattest: false,
        })
    }
}

#[async_trait]
impl Plugin for JoinTokenAttestor {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::NodeAttestor
    }

    async fn configure(
        &self,
        global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        let config: Config = parse_plugin_data(PLUGIN_NAME, data)?;
        if config.tokens.iter().any(|t| t.trim().is_empty() || t.contains('/')) {
            return Err(KeystoneError::InvalidArgument(
                "join tokens must be non-empty and must not contain `/`".into(),
            ));
        }
        let tokens: BTreeSet<String> = config.tokens.into_iter().collect();
        debug!(tokens = tokens.len(), "join token attestor configured");

        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(State {
            trust_domain: global.trust_domain.clone(),
            tokens,
        });
        Ok(())
    }

    fn bind_host_services(&self, services: &HostServices) {
        if self.services.set(services.clone()).is_err() {
            debug!("host services already bound");
        }
    }
}

#[async_trait]
impl NodeAttestor for JoinTokenAttestor {
    async fn attest(
        &self,
        request: &AttestationRequest,
    ) -> Result<AttestationResult, KeystoneError> {
        if request.attestation_type != PLUGIN_NAME {
            return Err(KeystoneError::InvalidArgument(format!(
                "unexpected attestation type `{}`",
                request.attestation_type
            )));
        }
        let token = std::str::from_utf8(&request.payload)
            .map_err(|_| KeystoneError::InvalidArgument("join token is not UTF-8".into()))?;

        let result = self.attest_token(token).await;
        self.count(if result.is_ok() { "success" } else { "failure" });
        result
    }
}
