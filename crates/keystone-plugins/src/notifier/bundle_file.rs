// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `bundle_file` notifier: keeps a JSON copy of the trust bundle on disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use keystone_core::types::{GlobalConfig, NotifierEvent, PluginKind};
use keystone_core::{HostServices, KeystoneError, Notifier, Plugin};

use crate::parse_plugin_data;

pub const PLUGIN_NAME: &str = "bundle_file";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    path: PathBuf,
}

#[derive(Default)]
pub struct BundleFileNotifier {
    path: RwLock<Option<PathBuf>>,
    services: OnceLock<HostServices>,
}

pub fn new_plugin() -> Arc<dyn Notifier> {
    Arc::new(BundleFileNotifier::default())
}

fn notifier_error(message: impl Into<String>) -> KeystoneError {
    KeystoneError::plugin(PluginKind::Notifier, PLUGIN_NAME, message)
}

impl BundleFileNotifier {
    fn path(&self) -> Result<PathBuf, KeystoneError> {
        self.path
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| notifier_error("not configured"))
    }

    async fn write_bundle(&self, event: &NotifierEvent) -> Result<(), KeystoneError> {
        let path = self.path()?;
        let services = self
            .services
            .get()
            .ok_or_else(|| notifier_error("host services are not bound"))?;
        let bundle = services.identity_provider.fetch_bundle().await?;
        let json = serde_json::to_vec_pretty(&bundle)
            .map_err(|e| notifier_error(format!("encoding bundle: {e}")))?;
        write_atomically(&path, &json).await?;
        debug!(?event, path = %path.display(), "bundle written");
        Ok(())
    }
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), KeystoneError> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| notifier_error(format!("writing {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| notifier_error(format!("replacing {}: {e}", path.display())))
}

#[async_trait]
impl Plugin for BundleFileNotifier {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Notifier
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        let config: Config = parse_plugin_data(PLUGIN_NAME, data)?;
        if config.path.as_os_str().is_empty() {
            return Err(KeystoneError::InvalidArgument("path must be set".into()));
        }
        *self
            .path
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(config.path);
        Ok(())
    }

    fn bind_host_services(&self, services: &HostServices) {
        if self.services.set(services.clone()).is_err() {
            debug!("host services already bound");
        }
    }
}

#[async_trait]
impl Notifier for BundleFileNotifier {
    async fn notify(&self, event: &NotifierEvent) -> Result<(), KeystoneError> {
        self.write_bundle(event).await
    }

    async fn notify_and_advise(&self, event: &NotifierEvent) -> Result<(), KeystoneError> {
        self.write_bundle(event).await
    }
}
