// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host-side services that plugins may call back into.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::types::{AgentInfo, Bundle, Label};

/// Gives plugins access to the server's own trust bundle.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch_bundle(&self) -> Result<Bundle, KeystoneError>;
}

/// Gives plugins read access to attested agents.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get_agent_info(&self, agent_id: &str) -> Result<Option<AgentInfo>, KeystoneError>;
}

/// Lets plugins emit metrics through the server's sink.
pub trait MetricsService: Send + Sync {
    fn incr_counter(&self, key: &[&str], value: u64, labels: &[Label]);
    fn add_sample(&self, key: &[&str], elapsed: Duration, labels: &[Label]);
    fn set_gauge(&self, key: &[&str], value: f64, labels: &[Label]);
}

/// The set of host services bound to every loaded plugin.
#[derive(Clone)]
pub struct HostServices {
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub agent_store: Arc<dyn AgentStore>,
    pub metrics: Arc<dyn MetricsService>,
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}
