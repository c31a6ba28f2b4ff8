// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stand-ins for the host services plugins call back into.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keystone_core::types::{AgentInfo, Bundle};
use keystone_core::{AgentStore, HostServices, IdentityProvider, KeystoneError};

use crate::metrics::RecordingMetrics;

/// Identity provider returning a fixed bundle, or `NotFound` when built with `None`.
pub struct MockIdentityProvider {
    bundle: Mutex<Option<Bundle>>,
}

impl MockIdentityProvider {
    pub fn new(bundle: Option<Bundle>) -> Self {
        Self {
            bundle: Mutex::new(bundle),
        }
    }

    pub fn set_bundle(&self, bundle: Bundle) {
        *self.bundle.lock().unwrap() = Some(bundle);
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn fetch_bundle(&self) -> Result<Bundle, KeystoneError> {
        self.bundle
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| KeystoneError::NotFound("server bundle".into()))
    }
}

#[derive(Default)]
pub struct MockAgentStore {
    agents: Mutex<HashMap<String, AgentInfo>>,
}

impl MockAgentStore {
    pub fn insert(&self, info: AgentInfo) {
        self.agents
            .lock()
            .unwrap()
            .insert(info.agent_id.clone(), info);
    }
}

#[async_trait]
impl AgentStore for MockAgentStore {
    async fn get_agent_info(&self, agent_id: &str) -> Result<Option<AgentInfo>, KeystoneError> {
        Ok(self.agents.lock().unwrap().get(agent_id).cloned())
    }
}

/// Host services with no bundle, no agents, and a recording metrics sink.
pub fn test_host_services() -> HostServices {
    HostServices {
        identity_provider: Arc::new(MockIdentityProvider::new(None)),
        agent_store: Arc::new(MockAgentStore::default()),
        metrics: Arc::new(RecordingMetrics::default()),
    }
}
