// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The built-in `sql` datastore.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use keystone_core::types::{AttestedNode, Bundle, GlobalConfig, PluginKind, Selector};
use keystone_core::{DataStore, KeystoneError, Plugin};

use crate::database::Database;
use crate::queries;

/// Name of the only supported datastore implementation.
pub const SQL_PLUGIN_NAME: &str = "sql";

const SQLITE3: &str = "sqlite3";

/// `plugin_data` accepted by the `sql` datastore.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlConfig {
    pub database_type: String,
    /// Database file path, or `:memory:`.
    pub connection_string: String,
}

impl SqlConfig {
    pub fn from_plugin_data(data: &serde_json::Value) -> Result<Self, KeystoneError> {
        let config: SqlConfig = serde_json::from_value(data.clone())
            .map_err(|e| KeystoneError::InvalidArgument(format!("sql datastore config: {e}")))?;
        if config.database_type != SQLITE3 {
            return Err(KeystoneError::InvalidArgument(format!(
                "unsupported database_type `{}`; expected `{SQLITE3}`",
                config.database_type
            )));
        }
        if config.connection_string.trim().is_empty() {
            return Err(KeystoneError::InvalidArgument(
                "connection_string must be set".into(),
            ));
        }
        Ok(config)
    }
}

/// SQLite-backed datastore.
///
/// The connection is opened by [`Plugin::configure`]; calls made before that
/// fail. Reconfiguring swaps in a new connection and closes the old one.
#[derive(Default)]
pub struct SqlDataStore {
    db: RwLock<Option<Database>>,
}

impl SqlDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn db(&self) -> Result<Database, KeystoneError> {
        self.db
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| KeystoneError::DataStore {
                source: "sql datastore is not configured".into(),
            })
    }

    fn replace(&self, db: Option<Database>) -> Option<Database> {
        let mut slot = self
            .db
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, db)
    }
}

#[async_trait]
impl Plugin for SqlDataStore {
    fn name(&self) -> &str {
        SQL_PLUGIN_NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::DataStore
    }

    async fn configure(
        &self,
        _global: &GlobalConfig,
        data: &serde_json::Value,
    ) -> Result<(), KeystoneError> {
        let config = SqlConfig::from_plugin_data(data)?;
        let db = Database::open(&config.connection_string).await?;
        info!(database_type = %config.database_type, "sql datastore connected");

        if let Some(previous) = self.replace(Some(db)) {
            previous.close().await?;
            debug!("closed previous sql datastore connection");
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), KeystoneError> {
        if let Some(db) = self.replace(None) {
            db.close().await?;
            debug!("sql datastore connection closed");
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for SqlDataStore {
    async fn create_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        queries::bundles::create_bundle(&self.db()?, bundle).await
    }

    async fn fetch_bundle(&self, trust_domain_id: &str) -> Result<Option<Bundle>, KeystoneError> {
        queries::bundles::fetch_bundle(&self.db()?, trust_domain_id).await
    }

    async fn list_bundles(&self) -> Result<Vec<Bundle>, KeystoneError> {
        queries::bundles::list_bundles(&self.db()?).await
    }

    async fn update_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError> {
        queries::bundles::update_bundle(&self.db()?, bundle).await
    }

    async fn append_bundle(&self, bundle: &Bundle) -> Result<Bundle, KeystoneError> {
        queries::bundles::append_bundle(&self.db()?, bundle).await
    }

    async fn delete_bundle(&self, trust_domain_id: &str) -> Result<(), KeystoneError> {
        queries::bundles::delete_bundle(&self.db()?, trust_domain_id).await
    }

    async fn create_attested_node(&self, node: &AttestedNode) -> Result<(), KeystoneError> {
        queries::nodes::create_attested_node(&self.db()?, node).await
    }

    async fn fetch_attested_node(
        &self,
        spiffe_id: &str,
    ) -> Result<Option<AttestedNode>, KeystoneError> {
        queries::nodes::fetch_attested_node(&self.db()?, spiffe_id).await
    }

    async fn list_attested_nodes(&self) -> Result<Vec<AttestedNode>, KeystoneError> {
        queries::nodes::list_attested_nodes(&self.db()?).await
    }

    async fn delete_attested_node(&self, spiffe_id: &str) -> Result<AttestedNode, KeystoneError> {
        queries::nodes::delete_attested_node(&self.db()?, spiffe_id).await
    }

    async fn set_node_selectors(
        &self,
        spiffe_id: &str,
        selectors: &[Selector],
    ) -> Result<(), KeystoneError> {
        queries::nodes::set_node_selectors(&self.db()?, spiffe_id, selectors).await
    }

    async fn get_node_selectors(&self, spiffe_id: &str) -> Result<Vec<Selector>, KeystoneError> {
        queries::nodes::get_node_selectors(&self.db()?, spiffe_id).await
    }
}
