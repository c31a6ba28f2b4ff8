// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for catalog loading, lookup, and release.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use keystone_catalog::{
    BuiltInRegistry, BuiltinLoader, Catalog, LoadedPlugins, Loader, LoaderConfig, Plugins,
    known_kinds, load,
};
use keystone_config::{PluginConfigMap, PluginEntryConfig};
use keystone_core::types::{AttestationRequest, Bundle, KeyType, NotifierEvent};
use keystone_core::{
    BuiltIn, ErrorCategory, KeyManager, KeystoneError, NodeAttestor, Notifier, PluginFactory,
    PluginKind, UpstreamAuthority,
};
use keystone_test_utils::{
    MemoryDataStore, MockKeyManager, MockNodeAttestor, MockNodeResolver, MockNotifier,
    MockUpstreamAuthority, PluginProbe, RecordingMetrics, StaticLoader, catalog_config,
    sql_in_memory, test_global, test_host_services,
};
use proptest::prelude::*;
use serde_json::json;
use tracing_test::traced_test;

fn entry(plugin_data: serde_json::Value) -> PluginEntryConfig {
    PluginEntryConfig {
        plugin_data,
        ..Default::default()
    }
}

fn with_entry(
    mut config: PluginConfigMap,
    kind: &str,
    name: &str,
    entry: PluginEntryConfig,
) -> PluginConfigMap {
    config
        .entry(kind.to_string())
        .or_default()
        .insert(name.to_string(), entry);
    config
}

fn plugins_with(
    node_attestors: Vec<Arc<dyn NodeAttestor>>,
    upstream_authority: Option<Arc<dyn UpstreamAuthority>>,
    notifiers: Vec<Arc<dyn Notifier>>,
) -> LoadedPlugins {
    LoadedPlugins {
        node_attestors,
        node_resolvers: Vec::new(),
        upstream_authority,
        key_manager: Arc::new(MockKeyManager::new("memory")),
        notifiers,
    }
}

fn expect_error<T>(result: Result<T, KeystoneError>) -> KeystoneError {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    }
}

// --- datastore bootstrap ---

/// Exactly one `sql` DataStore entry loads.
#[tokio::test]
async fn single_sql_datastore_loads() {
    let loader = Arc::new(StaticLoader::minimal());
    let repo = load(catalog_config(sql_in_memory(), loader.clone()))
        .await
        .unwrap();

    assert_eq!(loader.calls(), 1);
    assert_eq!(repo.data_store().name(), "sql");
    repo.close().await.unwrap();
}

/// No DataStore entry is a configuration error and the loader never runs.
#[tokio::test]
async fn missing_datastore_is_configuration_error() {
    let loader = Arc::new(StaticLoader::minimal());
    let err = expect_error(load(catalog_config(PluginConfigMap::new(), loader.clone())).await);

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("expecting a DataStore plugin"));
    assert_eq!(loader.calls(), 0);
}

/// Two DataStore entries are a configuration error.
#[tokio::test]
async fn two_datastores_are_configuration_error() {
    let config = with_entry(sql_in_memory(), "DataStore", "memory", entry(json!({})));
    let loader = Arc::new(StaticLoader::minimal());
    let err = expect_error(load(catalog_config(config, loader.clone())).await);

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("only one DataStore"));
    assert_eq!(loader.calls(), 0);
}

/// A DataStore other than the built-in `sql` is rejected.
#[tokio::test]
async fn non_sql_datastore_is_unsupported() {
    let config = with_entry(PluginConfigMap::new(), "DataStore", "postgres", entry(json!({})));
    let err = expect_error(load(catalog_config(config, Arc::new(StaticLoader::minimal()))).await);

    assert!(matches!(
        err,
        KeystoneError::UnsupportedPlugin { kind: PluginKind::DataStore, ref name, .. } if name == "postgres"
    ));
    assert!(err.is_configuration());
}

/// An externally hosted `sql` DataStore is rejected too.
#[tokio::test]
async fn external_sql_datastore_is_unsupported() {
    let mut config = sql_in_memory();
    if let Some(sql) = config
        .get_mut("DataStore")
        .and_then(|entries| entries.get_mut("sql"))
    {
        sql.plugin_cmd = Some("/usr/local/bin/sql-plugin".into());
    }
    let err = expect_error(load(catalog_config(config, Arc::new(StaticLoader::minimal()))).await);

    assert!(matches!(err, KeystoneError::UnsupportedPlugin { .. }));
}

/// A datastore that rejects its settings fails with the subsystem category.
#[tokio::test]
async fn bad_datastore_settings_fail_subsystem_configuration() {
    let config = with_entry(
        PluginConfigMap::new(),
        "DataStore",
        "sql",
        entry(json!({"database_type": "postgres", "connection_string": "x"})),
    );
    let loader = Arc::new(StaticLoader::minimal());
    let err = expect_error(load(catalog_config(config, loader.clone())).await);

    assert_eq!(err.category(), ErrorCategory::SubsystemConfiguration);
    assert_eq!(loader.calls(), 0);
}

/// The loader sees every entry except the DataStore one.
#[tokio::test]
async fn loader_receives_config_without_datastore() {
    let config = with_entry(sql_in_memory(), "KeyManager", "memory", entry(json!({})));
    let loader = Arc::new(StaticLoader::minimal());
    let repo = load(catalog_config(config, loader.clone())).await.unwrap();

    let received = loader.received().unwrap();
    assert!(!received.plugin_config.contains_key("DataStore"));
    assert!(received.plugin_config.contains_key("KeyManager"));
    assert!(!received.known_kinds.contains(&PluginKind::DataStore));
    assert!(received.builtins.get(PluginKind::KeyManager, "memory").is_some());
    assert_eq!(received.global, test_global());
    repo.close().await.unwrap();
}

// --- registry ---

/// Attestor lookups resolve by name; unknown names are absent.
#[tokio::test]
async fn attestors_resolve_by_name() {
    let loaded = plugins_with(
        vec![
            Arc::new(MockNodeAttestor::new("join_token")),
            Arc::new(MockNodeAttestor::new("x509pop")),
        ],
        None,
        Vec::new(),
    );
    let repo = load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded))))
        .await
        .unwrap();

    assert_eq!(repo.node_attestor_names(), vec!["join_token", "x509pop"]);
    let attestor = repo.node_attestor_named("x509pop").unwrap();
    let result = attestor
        .attest(&AttestationRequest {
            attestation_type: "x509pop".into(),
            payload: b"host-1".to_vec(),
        })
        .await
        .unwrap();
    assert!(result.agent_id.ends_with("/x509pop/host-1"));
    assert!(repo.node_attestor_named("aws_iid").is_none());
    repo.close().await.unwrap();
}

/// Resolvers are exposed by name as well.
#[tokio::test]
async fn resolvers_resolve_by_name() {
    let mut loaded = plugins_with(Vec::new(), None, Vec::new());
    loaded.node_resolvers = vec![Arc::new(MockNodeResolver::new("azure_msi"))];
    let repo = load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded))))
        .await
        .unwrap();

    let resolver = repo.node_resolver_named("azure_msi").unwrap();
    let resolved = resolver
        .resolve(&["spiffe://example.org/agent".to_string()])
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert!(repo.node_resolver_named("noop").is_none());
    repo.close().await.unwrap();
}

/// Notifiers come back in the order the loader produced them.
#[tokio::test]
async fn notifier_order_is_preserved() {
    let probe = PluginProbe::new();
    let notifiers: Vec<Arc<dyn Notifier>> = ["c", "a", "b"]
        .into_iter()
        .map(|name| Arc::new(MockNotifier::with_probe(name, probe.clone())) as Arc<dyn Notifier>)
        .collect();
    let loaded = plugins_with(Vec::new(), None, notifiers);
    let repo = load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded))))
        .await
        .unwrap();

    let names: Vec<&str> = repo.notifiers().iter().map(|n| n.name()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);

    for notifier in repo.notifiers() {
        notifier.notify(&NotifierEvent::BundleLoaded).await.unwrap();
    }
    let order: Vec<String> = probe.events().into_iter().map(|(name, _)| name).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
    repo.close().await.unwrap();
}

/// Without an upstream authority the slot reports absence.
#[tokio::test]
async fn upstream_authority_absent() {
    let repo = load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::minimal())))
        .await
        .unwrap();

    assert!(repo.upstream_authority().is_none());
    assert_eq!(repo.count(PluginKind::UpstreamAuthority), 0);
    repo.close().await.unwrap();
}

/// A present upstream authority is the exact instance the loader returned.
#[tokio::test]
async fn upstream_authority_present_is_same_instance() {
    let upstream: Arc<dyn UpstreamAuthority> = Arc::new(MockUpstreamAuthority::new("disk"));
    let loaded = plugins_with(Vec::new(), Some(upstream.clone()), Vec::new());
    let repo = load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded))))
        .await
        .unwrap();

    let found = repo.upstream_authority().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&found), Arc::as_ptr(&upstream)));
    repo.close().await.unwrap();
}

/// Two attestors sharing a name fail the load and release what was loaded.
#[tokio::test]
async fn duplicate_attestor_names_are_rejected() {
    let probe = PluginProbe::new();
    let loaded = plugins_with(
        vec![
            Arc::new(MockNodeAttestor::with_probe("join_token", probe.clone())),
            Arc::new(MockNodeAttestor::with_probe("join_token", probe.clone())),
        ],
        None,
        Vec::new(),
    );
    let err = expect_error(
        load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded)))).await,
    );

    assert!(matches!(
        err,
        KeystoneError::DuplicatePlugin { kind: PluginKind::NodeAttestor, ref name } if name == "join_token"
    ));
    assert_eq!(probe.shutdowns(), 2);
}

proptest! {
    /// Every unique attestor name resolves and nothing else does.
    #[test]
    fn facade_exposes_exactly_the_loaded_attestors(
        names in prop::collection::btree_set("[a-z_]{1,12}", 0..8),
        other in "[A-Z]{1,6}",
    ) {
        let attestors: Vec<Arc<dyn NodeAttestor>> = names
            .iter()
            .map(|name| Arc::new(MockNodeAttestor::new(name)) as Arc<dyn NodeAttestor>)
            .collect();
        let plugins = Plugins::from_loaded(
            Arc::new(MemoryDataStore::new()),
            plugins_with(attestors, None, Vec::new()),
        )
        .unwrap();

        for name in &names {
            let attestor = plugins.node_attestor_named(name);
            prop_assert!(attestor.is_some());
            let attestor = attestor.unwrap();
            prop_assert_eq!(attestor.name(), name.as_str());
        }
        prop_assert!(plugins.node_attestor_named(&other).is_none());
        let listed: BTreeSet<String> = plugins.node_attestor_names().into_iter().collect();
        prop_assert_eq!(listed, names);
    }
}

// --- decoration ---

/// Datastore calls succeed and fail through the decorations exactly as on
/// the bare store, and are counted on the catalog's metrics sink.
#[tokio::test]
async fn decorated_datastore_preserves_outcomes() {
    let metrics = Arc::new(RecordingMetrics::default());
    let config = keystone_catalog::CatalogConfig {
        metrics: metrics.clone(),
        ..catalog_config(sql_in_memory(), Arc::new(StaticLoader::minimal()))
    };
    let repo = load(config).await.unwrap();
    let ds = repo.data_store();

    let bundle = Bundle::new("spiffe://example.org");
    ds.create_bundle(&bundle).await.unwrap();
    assert!(matches!(
        ds.create_bundle(&bundle).await,
        Err(KeystoneError::AlreadyExists(_))
    ));
    assert_eq!(ds.fetch_bundle("spiffe://example.org").await.unwrap(), Some(bundle));
    assert_eq!(ds.fetch_bundle("spiffe://other.org").await.unwrap(), None);
    assert!(matches!(
        ds.delete_bundle("spiffe://other.org").await,
        Err(KeystoneError::NotFound(_))
    ));

    let created = metrics.counters_named("datastore.create_bundle");
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].label("status"), Some("OK"));
    assert_eq!(created[1].label("status"), Some("already_exists"));
    repo.close().await.unwrap();
}

/// Key manager calls keep their outcomes through the metrics wrapper.
#[tokio::test]
async fn decorated_key_manager_preserves_outcomes() {
    let metrics = Arc::new(RecordingMetrics::default());
    let config = keystone_catalog::CatalogConfig {
        metrics: metrics.clone(),
        ..catalog_config(sql_in_memory(), Arc::new(StaticLoader::minimal()))
    };
    let repo = load(config).await.unwrap();
    let km = repo.key_manager();

    let bare = MockKeyManager::new("memory");
    let decorated_key = km.generate_key("x509-CA-A", KeyType::Ed25519).await.unwrap();
    let bare_key = bare.generate_key("x509-CA-A", KeyType::Ed25519).await.unwrap();
    assert_eq!(decorated_key, bare_key);
    assert_eq!(
        km.sign_data("x509-CA-A", b"payload").await.unwrap(),
        bare.sign_data("x509-CA-A", b"payload").await.unwrap()
    );
    assert!(km.sign_data("missing", b"payload").await.is_err());
    assert!(bare.sign_data("missing", b"payload").await.is_err());

    assert_eq!(km.name(), "memory");
    assert_eq!(metrics.counters_named("key_manager.sign_data").len(), 2);
    repo.close().await.unwrap();
}

/// The loaded-plugin gauge is reported for every kind.
#[tokio::test]
async fn plugin_counts_are_reported() {
    let metrics = Arc::new(RecordingMetrics::default());
    let loaded = plugins_with(
        vec![Arc::new(MockNodeAttestor::new("join_token"))],
        None,
        vec![Arc::new(MockNotifier::new("a")), Arc::new(MockNotifier::new("b"))],
    );
    let config = keystone_catalog::CatalogConfig {
        metrics: metrics.clone(),
        ..catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded)))
    };
    let repo = load(config).await.unwrap();

    let gauges: BTreeMap<String, f64> = metrics
        .gauges()
        .into_iter()
        .filter(|g| g.key == "catalog.plugins_loaded")
        .filter_map(|g| g.label("kind").map(|k| (k.to_string(), g.value)))
        .collect();
    assert_eq!(gauges.len(), PluginKind::ALL.len());
    assert_eq!(gauges["NodeAttestor"], 1.0);
    assert_eq!(gauges["Notifier"], 2.0);
    assert_eq!(gauges["UpstreamAuthority"], 0.0);
    repo.close().await.unwrap();
}

// --- release ---

/// Close shuts every loaded plugin down in reverse order; a second close is a no-op.
#[tokio::test]
async fn close_releases_in_reverse_and_is_idempotent() {
    let probe = PluginProbe::new();
    let loaded = LoadedPlugins {
        node_attestors: vec![Arc::new(MockNodeAttestor::with_probe("join_token", probe.clone()))],
        node_resolvers: vec![Arc::new(MockNodeResolver::with_probe("noop", probe.clone()))],
        upstream_authority: Some(Arc::new(MockUpstreamAuthority::with_probe(
            "disk",
            probe.clone(),
        ))),
        key_manager: Arc::new(MockKeyManager::with_probe("memory", probe.clone())),
        notifiers: vec![Arc::new(MockNotifier::with_probe("bundle_file", probe.clone()))],
    };
    let repo = load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded))))
        .await
        .unwrap();
    assert_eq!(probe.shutdowns(), 0);

    repo.close().await.unwrap();
    assert_eq!(
        probe.shutdown_order(),
        vec!["bundle_file", "memory", "disk", "noop", "join_token"]
    );

    repo.close().await.unwrap();
    assert_eq!(probe.shutdowns(), 5);
}

/// A failing shutdown is reported but does not stop the others.
#[tokio::test]
async fn close_reports_failures_and_keeps_going() {
    let failing = PluginProbe::new();
    failing.fail_shutdown(true);
    let healthy = PluginProbe::new();
    let loaded = LoadedPlugins {
        node_attestors: vec![Arc::new(MockNodeAttestor::with_probe("a", healthy.clone()))],
        node_resolvers: Vec::new(),
        upstream_authority: None,
        key_manager: Arc::new(MockKeyManager::with_probe("memory", failing.clone())),
        notifiers: vec![Arc::new(MockNotifier::with_probe("n", healthy.clone()))],
    };
    let repo = load(catalog_config(sql_in_memory(), Arc::new(StaticLoader::new(loaded))))
        .await
        .unwrap();

    let err = expect_error(repo.close().await);
    assert!(matches!(err, KeystoneError::Release(ref failures) if failures.len() == 1));
    assert!(err.to_string().contains("KeyManager `memory`"));
    assert_eq!(healthy.shutdown_order(), vec!["n", "a"]);
}

/// A loader failure surfaces unchanged.
#[tokio::test]
async fn loader_failure_is_returned() {
    let loader = Arc::new(StaticLoader::failing("plugin host crashed"));
    let err = expect_error(load(catalog_config(sql_in_memory(), loader.clone())).await);

    assert_eq!(err.category(), ErrorCategory::Loader);
    assert!(err.to_string().contains("plugin host crashed"));
    assert_eq!(loader.calls(), 1);
}

/// A loader failure releases the datastore bootstrapped before it.
#[tokio::test]
#[traced_test]
async fn loader_failure_releases_the_datastore() {
    let loader = Arc::new(StaticLoader::failing("plugin host crashed"));
    expect_error(load(catalog_config(sql_in_memory(), loader)).await);

    assert!(logs_contain("sql datastore connection closed"));
}

// --- built-in loader ---

fn loader_config(plugin_config: PluginConfigMap) -> LoaderConfig {
    LoaderConfig {
        global: test_global(),
        builtins: Arc::new(keystone_plugins::builtins().into_iter().collect::<BuiltInRegistry>()),
        known_kinds: known_kinds(),
        plugin_config,
        host_services: test_host_services(),
    }
}

fn memory_key_manager() -> PluginConfigMap {
    with_entry(PluginConfigMap::new(), "KeyManager", "memory", entry(json!({})))
}

async fn fill_err(plugin_config: PluginConfigMap) -> KeystoneError {
    expect_error(BuiltinLoader.fill(loader_config(plugin_config)).await)
}

/// The minimal configuration loads just the key manager.
#[tokio::test]
async fn builtin_loader_loads_key_manager() {
    let (loaded, closer) = BuiltinLoader
        .fill(loader_config(memory_key_manager()))
        .await
        .unwrap();

    assert_eq!(loaded.key_manager.name(), "memory");
    assert!(loaded.node_attestors.is_empty());
    assert!(loaded.upstream_authority.is_none());
    assert_eq!(closer.len(), 1);
    closer.close().await.unwrap();
}

/// Unknown plugin kinds are loader errors.
#[tokio::test]
async fn builtin_loader_rejects_unknown_kind() {
    let config = with_entry(memory_key_manager(), "WorkloadAttestor", "unix", entry(json!({})));
    let err = fill_err(config).await;

    assert_eq!(err.category(), ErrorCategory::Loader);
    assert!(err.to_string().contains("WorkloadAttestor"));
}

/// A DataStore entry never reaches the generic loader.
#[tokio::test]
async fn builtin_loader_rejects_datastore_kind() {
    let mut config = memory_key_manager();
    config.extend(sql_in_memory());
    let err = fill_err(config).await;

    assert!(matches!(err, KeystoneError::Loader(ref msg) if msg.contains("DataStore")));
}

/// Externally hosted plugins are not supported by the built-in loader.
#[tokio::test]
async fn builtin_loader_rejects_external_plugins() {
    let external = PluginEntryConfig {
        plugin_cmd: Some("/opt/plugins/aws_iid".into()),
        ..Default::default()
    };
    let err = fill_err(with_entry(memory_key_manager(), "NodeAttestor", "aws_iid", external)).await;

    assert!(matches!(err, KeystoneError::Loader(ref msg) if msg.contains("plugin_cmd")));
}

/// Names without a built-in are loader errors.
#[tokio::test]
async fn builtin_loader_rejects_unknown_builtin() {
    let err = fill_err(with_entry(PluginConfigMap::new(), "KeyManager", "vault", entry(json!({})))).await;

    assert!(matches!(err, KeystoneError::Loader(ref msg) if msg.contains("vault")));
}

/// Exactly one key manager must be enabled.
#[tokio::test]
async fn builtin_loader_requires_exactly_one_key_manager() {
    let err = fill_err(PluginConfigMap::new()).await;
    assert!(err.to_string().contains("expecting a KeyManager"));

    let dir = tempfile::tempdir().unwrap();
    let two = with_entry(
        memory_key_manager(),
        "KeyManager",
        "disk",
        entry(json!({"keys_path": dir.path().join("keys.json")})),
    );
    let err = fill_err(two).await;
    assert!(err.to_string().contains("only one KeyManager"));
}

/// Disabled entries are skipped and do not count toward cardinality.
#[tokio::test]
async fn builtin_loader_skips_disabled_entries() {
    let disabled = PluginEntryConfig {
        enabled: Some(false),
        ..Default::default()
    };
    let config = with_entry(memory_key_manager(), "NodeAttestor", "join_token", disabled.clone());
    let config = with_entry(config, "KeyManager", "disk", disabled);
    let (loaded, closer) = BuiltinLoader.fill(loader_config(config)).await.unwrap();

    assert!(loaded.node_attestors.is_empty());
    assert_eq!(loaded.key_manager.name(), "memory");
    closer.close().await.unwrap();
}

/// A plugin rejecting its settings names itself in the error.
#[tokio::test]
async fn builtin_loader_reports_configure_failure() {
    let config = with_entry(
        memory_key_manager(),
        "NodeAttestor",
        "join_token",
        entry(json!({"tokens": ["has/slash"]})),
    );
    let err = fill_err(config).await;

    assert!(matches!(
        err,
        KeystoneError::PluginConfigure { kind: PluginKind::NodeAttestor, ref name, .. } if name == "join_token"
    ));
    assert_eq!(err.category(), ErrorCategory::Loader);
}

// --- end to end ---

/// Real built-ins load through the catalog and are usable.
#[tokio::test]
#[traced_test]
async fn loads_builtin_plugins_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let bundle_path = dir.path().join("bundle.json");
    let config = with_entry(
        memory_key_manager(),
        "NodeAttestor",
        "join_token",
        entry(json!({"tokens": ["abc123"]})),
    );
    let config = with_entry(config, "NodeResolver", "noop", entry(json!({})));
    let config = with_entry(config, "Notifier", "bundle_file", entry(json!({"path": bundle_path})));
    let mut config = config;
    config.extend(sql_in_memory());

    let repo = load(catalog_config(config, Arc::new(BuiltinLoader)))
        .await
        .unwrap();

    assert_eq!(repo.node_attestor_names(), vec!["join_token"]);
    assert_eq!(repo.node_resolver_names(), vec!["noop"]);
    assert_eq!(repo.notifiers().len(), 1);

    let attested = repo
        .node_attestor_named("join_token")
        .unwrap()
        .attest(&AttestationRequest {
            attestation_type: "join_token".into(),
            payload: b"abc123".to_vec(),
        })
        .await
        .unwrap();
    assert_eq!(
        attested.agent_id,
        "spiffe://example.org/spire/agent/join_token/abc123"
    );

    let key = repo
        .key_manager()
        .generate_key("jwt-A", KeyType::Ed25519)
        .await
        .unwrap();
    assert_eq!(key.bytes.len(), 32);

    assert!(logs_contain("plugin catalog loaded"));
    repo.close().await.unwrap();
}

static VAULT_PROBE: LazyLock<Arc<PluginProbe>> = LazyLock::new(PluginProbe::new);
static AUDIT_PROBE: LazyLock<Arc<PluginProbe>> = LazyLock::new(|| {
    let probe = PluginProbe::new();
    probe.fail_configure(true);
    probe
});

fn vault_key_manager() -> Arc<dyn KeyManager> {
    Arc::new(MockKeyManager::with_probe("vault", Arc::clone(&VAULT_PROBE)))
}

fn audit_notifier() -> Arc<dyn Notifier> {
    Arc::new(MockNotifier::with_probe("audit", Arc::clone(&AUDIT_PROBE)))
}

/// A configure failure releases every plugin started before it, and the
/// failing plugin itself.
#[tokio::test]
async fn builtin_loader_releases_started_plugins_on_configure_failure() {
    let builtins: BuiltInRegistry = [
        BuiltIn {
            name: "vault",
            description: "key manager that configures",
            factory: PluginFactory::KeyManager(vault_key_manager),
        },
        BuiltIn {
            name: "audit",
            description: "notifier that rejects its configuration",
            factory: PluginFactory::Notifier(audit_notifier),
        },
    ]
    .into_iter()
    .collect();
    let plugin_config = with_entry(
        with_entry(PluginConfigMap::new(), "KeyManager", "vault", entry(json!({}))),
        "Notifier",
        "audit",
        entry(json!({})),
    );
    let config = LoaderConfig {
        builtins: Arc::new(builtins),
        ..loader_config(plugin_config)
    };

    let err = expect_error(BuiltinLoader.fill(config).await);

    assert!(matches!(
        err,
        KeystoneError::PluginConfigure { kind: PluginKind::Notifier, ref name, .. } if name == "audit"
    ));
    assert_eq!(VAULT_PROBE.configures(), 1);
    assert_eq!(VAULT_PROBE.shutdown_order(), vec!["vault"]);
    assert_eq!(AUDIT_PROBE.shutdown_order(), vec!["audit"]);
}
