// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::KeystoneConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one. Plugin kinds
/// and cardinalities are checked later by the catalog, which knows the
/// built-ins.
pub fn validate_config(config: &KeystoneConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let trust_domain = config.server.trust_domain.trim();
    if trust_domain.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.trust_domain must be set".to_string(),
        });
    } else if !is_valid_trust_domain(trust_domain) {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.trust_domain `{trust_domain}` may only contain lowercase letters, digits, `.`, `-` and `_`"
            ),
        });
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level `{}` is not one of {}",
                config.server.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.telemetry.prometheus
        && config
            .telemetry
            .prometheus_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "telemetry.prometheus_address `{}` is not a socket address",
                config.telemetry.prometheus_address
            ),
        });
    }

    for (kind, entries) in &config.plugins {
        for name in entries.keys() {
            if name.trim().is_empty() {
                errors.push(ConfigError::Validation {
                    message: format!("plugins.{kind} contains an entry with an empty name"),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_trust_domain(td: &str) -> bool {
    td.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
}
