// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keystone run` command implementation.
//!
//! Loads the plugin catalog, wires the datastore-backed host services,
//! makes sure the server bundle exists, advises notifiers, and serves until
//! a shutdown signal arrives. The catalog is always released on the way out.

use std::future::Future;
use std::sync::Arc;

use keystone_catalog::{
    BuiltinLoader, BundleIdentityProvider, Catalog, CatalogConfig, DataStoreAgentStore,
    Repository, load,
};
use keystone_config::KeystoneConfig;
use keystone_core::types::{Bundle, CaSigningRequest, KeyType, NotifierEvent};
use keystone_core::{GlobalConfig, KeystoneError, MetricsService, SystemClock};
use keystone_telemetry::{BlackholeMetrics, FacadeMetrics, PluginMetrics, install_prometheus};
use tracing::{info, warn};

use crate::shutdown;

/// Key manager slot holding the server CA key.
const SERVER_CA_KEY_ID: &str = "x509-CA";

/// Runs the `keystone run` command.
pub async fn run_server(config: KeystoneConfig) -> Result<(), KeystoneError> {
    init_tracing(&config.server.log_level);
    info!(trust_domain = %config.server.trust_domain, "starting keystone");

    let metrics: Arc<dyn MetricsService> = if config.telemetry.prometheus {
        install_prometheus(&config.telemetry.prometheus_address)?;
        Arc::new(FacadeMetrics::default())
    } else {
        Arc::new(BlackholeMetrics)
    };

    let global = config.global();
    let identity = Arc::new(BundleIdentityProvider::new(global.trust_domain_id()));
    let agents = Arc::new(DataStoreAgentStore::new());

    let repo = load(CatalogConfig {
        global: global.clone(),
        plugin_config: config.plugins,
        metrics: Arc::clone(&metrics),
        clock: Arc::new(SystemClock),
        identity_provider: identity.clone(),
        agent_store: agents.clone(),
        metrics_service: Arc::new(PluginMetrics::new(metrics)),
        loader: Arc::new(BuiltinLoader),
    })
    .await?;

    let served = serve(
        &repo,
        &global,
        &identity,
        &agents,
        shutdown::wait_for_signal(),
    )
    .await;
    let released = repo.close().await;
    if let Err(e) = &released {
        warn!(error = %e, "failed to release the plugin catalog");
    }
    info!("keystone stopped");
    served.and(released)
}

async fn serve(
    repo: &Repository,
    global: &GlobalConfig,
    identity: &BundleIdentityProvider,
    agents: &DataStoreAgentStore,
    shutdown: impl Future<Output = ()>,
) -> Result<(), KeystoneError> {
    identity.bind(repo.data_store())?;
    agents.bind(repo.data_store())?;

    let bundle = bootstrap_bundle(repo.catalog(), global).await?;
    info!(
        trust_domain = %bundle.trust_domain_id,
        roots = bundle.root_cas.len(),
        "server bundle ready"
    );
    advise_notifiers(repo.catalog(), &NotifierEvent::BundleLoaded).await?;

    info!("keystone ready");
    shutdown.await;
    Ok(())
}

/// Make sure the server CA key exists and its root is in the stored bundle.
///
/// With an upstream authority the CA is signed upstream and the upstream
/// roots are published; otherwise the CA key itself is the root.
async fn bootstrap_bundle(
    catalog: &impl Catalog,
    global: &GlobalConfig,
) -> Result<Bundle, KeystoneError> {
    let key_manager = catalog.key_manager();
    let ca_key = match key_manager.get_public_key(SERVER_CA_KEY_ID).await? {
        Some(key) => key,
        None => {
            info!(key_id = SERVER_CA_KEY_ID, "generating server CA key");
            key_manager
                .generate_key(SERVER_CA_KEY_ID, KeyType::Ed25519)
                .await?
        }
    };

    let mut bundle = Bundle::new(global.trust_domain_id());
    match catalog.upstream_authority() {
        Some(upstream) => {
            let signed = upstream
                .mint_ca(&CaSigningRequest {
                    public_key: ca_key,
                    preferred_ttl_secs: 0,
                })
                .await?;
            info!(
                upstream = upstream.name(),
                not_after = signed.not_after,
                "server CA signed upstream"
            );
            bundle.root_cas.extend(signed.upstream_roots);
        }
        None => bundle.root_cas.push(ca_key.bytes),
    }

    catalog.data_store().append_bundle(&bundle).await
}

async fn advise_notifiers(
    catalog: &impl Catalog,
    event: &NotifierEvent,
) -> Result<(), KeystoneError> {
    for notifier in catalog.notifiers() {
        notifier.notify_and_advise(event).await?;
    }
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keystone={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
