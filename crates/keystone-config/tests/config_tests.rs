// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Keystone configuration system.

use std::io::Write;

use keystone_config::diagnostic::ConfigError;
use keystone_config::{load_and_validate, load_and_validate_str, load_config_from_str};

const SERVER_TOML: &str = r#"
[server]
trust_domain = "example.org"
log_level = "debug"

[telemetry]
prometheus = true

[plugins.DataStore.sql]
plugin_data = { database_type = "sqlite3", connection_string = "/var/lib/keystone/datastore.db" }

[plugins.KeyManager.disk]
plugin_data = { keys_path = "/var/lib/keystone/keys.json" }

[plugins.NodeAttestor.join_token]
plugin_data = { tokens = ["abc", "def"] }

[plugins.Notifier.bundle_file]
plugin_data = { path = "/tmp/bundle.json" }
"#;

#[test]
fn full_server_config_deserializes() {
    let config = load_and_validate_str(SERVER_TOML).expect("config should be valid");
    assert_eq!(config.server.trust_domain, "example.org");
    assert_eq!(config.server.log_level, "debug");
    assert!(config.telemetry.prometheus);
    assert_eq!(config.plugins.len(), 4);

    let tokens = &config.plugins["NodeAttestor"]["join_token"].plugin_data["tokens"];
    assert_eq!(tokens.as_array().map(Vec::len), Some(2));
    assert_eq!(
        config.plugins["DataStore"]["sql"].plugin_data["connection_string"],
        "/var/lib/keystone/datastore.db"
    );
}

#[test]
fn empty_config_uses_defaults_but_fails_validation() {
    let config = load_config_from_str("").expect("empty TOML should deserialize");
    assert_eq!(config.server.log_level, "info");
    assert!(!config.telemetry.prometheus);
    assert!(config.plugins.is_empty());

    let errors = load_and_validate_str("").expect_err("trust domain is required");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("trust_domain"))));
}

#[test]
fn unknown_server_key_is_reported_with_suggestion() {
    let toml = r#"
[server]
trust_domian = "example.org"
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key should fail");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, span, ..
            } => Some((key.clone(), suggestion.clone(), *span)),
            _ => None,
        })
        .expect("should produce an UnknownKey diagnostic");
    assert_eq!(unknown.0, "trust_domian");
    assert_eq!(unknown.1.as_deref(), Some("trust_domain"));
    assert!(unknown.2.is_some(), "span should point at the key");
}

#[test]
fn plugin_data_type_mismatch_is_reported() {
    let toml = r#"
[server]
trust_domain = "example.org"

[plugins.KeyManager.memory]
enabled = "yes"
"#;
    let errors = load_and_validate_str(toml).expect_err("bool expected");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidType { .. })));
}

#[test]
fn file_config_honours_env_overrides() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("server.toml", SERVER_TOML)?;
        jail.set_env("KEYSTONE_SERVER_TRUST_DOMAIN", "override.example");
        jail.set_env("KEYSTONE_TELEMETRY_PROMETHEUS", "false");

        let config = load_and_validate(std::path::Path::new("server.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.server.trust_domain, "override.example");
        assert!(!config.telemetry.prometheus);
        Ok(())
    });
}

#[test]
fn env_override_fills_a_key_absent_from_the_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "server.toml",
            "[server]\ntrust_domain = \"example.org\"\n",
        )?;
        jail.set_env("KEYSTONE_SERVER_LOG_LEVEL", "debug");

        let config = load_and_validate(std::path::Path::new("server.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.trust_domain, "example.org");
        Ok(())
    });
}

#[test]
fn missing_file_falls_back_to_defaults() {
    figment::Jail::expect_with(|_jail| {
        let errors = load_and_validate(std::path::Path::new("absent.toml"))
            .expect_err("no trust domain without a file");
        assert!(errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. })));
        Ok(())
    });
}

#[test]
fn file_config_loads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SERVER_TOML.as_bytes()).unwrap();

    let config = keystone_config::load_config_from_path(file.path()).unwrap();
    assert!(config.plugins.contains_key("Notifier"));
}
