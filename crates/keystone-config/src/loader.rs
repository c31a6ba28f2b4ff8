// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier): compiled defaults, the TOML file,
//! then `KEYSTONE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KeystoneConfig;

/// Load configuration from a TOML file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KeystoneConfig, figment::Error> {
    build_figment(path).extract()
}

/// Load configuration from a TOML string only (no file, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<KeystoneConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeystoneConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Build the Figment used for file-based loading, before extraction.
pub fn build_figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KeystoneConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
}

/// Environment variable provider mapping `KEYSTONE_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses an explicit section map rather than `Env::split("_")` because keys
/// such as `trust_domain` contain underscores. Plugin tables are not
/// overridable from the environment.
fn env_provider() -> Env {
    Env::prefixed("KEYSTONE_").filter_map(|key| {
        // figment hands over the key with its original case.
        let key = key.as_str().to_ascii_lowercase();
        ["server_", "telemetry_"]
            .iter()
            .find(|section| key.starts_with(*section))
            .map(|section| {
                let dotted = format!("{}.", section.trim_end_matches('_'));
                key.replacen(section, &dotted, 1).into()
            })
    })
}
