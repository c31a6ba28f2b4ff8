// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Datastore trait for bundle and node persistence.

use async_trait::async_trait;

use crate::error::KeystoneError;
use crate::traits::plugin::Plugin;
use crate::types::{AttestedNode, Bundle, Selector};

/// Persistence for trust bundles, attested nodes, and node selectors.
///
/// The datastore is the highest-traffic subsystem; the catalog wires the
/// built-in implementation directly rather than through the plugin loader.
#[async_trait]
pub trait DataStore: Plugin {
    /// Stores a new bundle. Fails with `AlreadyExists` if the trust domain has one.
    async fn create_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError>;

    /// Fetches the bundle for a trust domain, `None` if there is none.
    async fn fetch_bundle(&self, trust_domain_id: &str) -> Result<Option<Bundle>, KeystoneError>;

    /// Lists every stored bundle ordered by trust domain.
    async fn list_bundles(&self) -> Result<Vec<Bundle>, KeystoneError>;

    /// Replaces an existing bundle. Fails with `NotFound` if there is none.
    async fn update_bundle(&self, bundle: &Bundle) -> Result<(), KeystoneError>;

    /// Merges `bundle` into the stored one, creating it if missing.
    async fn append_bundle(&self, bundle: &Bundle) -> Result<Bundle, KeystoneError>;

    /// Deletes the bundle for a trust domain. Fails with `NotFound` if there is none.
    async fn delete_bundle(&self, trust_domain_id: &str) -> Result<(), KeystoneError>;

    /// Stores a newly attested node. Fails with `AlreadyExists` on a duplicate ID.
    async fn create_attested_node(&self, node: &AttestedNode) -> Result<(), KeystoneError>;

    /// Fetches an attested node by SPIFFE ID.
    async fn fetch_attested_node(
        &self,
        spiffe_id: &str,
    ) -> Result<Option<AttestedNode>, KeystoneError>;

    /// Lists attested nodes ordered by SPIFFE ID.
    async fn list_attested_nodes(&self) -> Result<Vec<AttestedNode>, KeystoneError>;

    /// Deletes an attested node and its selectors, returning the deleted node.
    async fn delete_attested_node(&self, spiffe_id: &str) -> Result<AttestedNode, KeystoneError>;

    /// Replaces the selectors associated with a node.
    async fn set_node_selectors(
        &self,
        spiffe_id: &str,
        selectors: &[Selector],
    ) -> Result<(), KeystoneError>;

    /// Returns the selectors associated with a node, empty if none.
    async fn get_node_selectors(&self, spiffe_id: &str) -> Result<Vec<Selector>, KeystoneError>;
}
