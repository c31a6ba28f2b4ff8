// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Keystone trust server.
//!
//! Parses the server TOML file with strict validation (`deny_unknown_fields`),
//! applies `KEYSTONE_*` environment overrides, and renders failures as miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let config = keystone_config::load_and_validate(Path::new("server.toml"))
//!     .expect("config errors");
//! println!("trust domain: {}", config.server.trust_domain);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config_from_path, load_config_from_str};
pub use model::{KeystoneConfig, PluginConfigMap, PluginEntryConfig};

/// Load configuration from `path` (plus env overrides) and validate it.
pub fn load_and_validate(path: &Path) -> Result<KeystoneConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let content = std::fs::read_to_string(path).ok();
            let name = path.display().to_string();
            let source = content.as_deref().map(|c| (name.as_str(), c));
            Err(diagnostic::figment_to_config_errors(err, source))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<KeystoneConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            Some(("<inline>", toml_content)),
        )),
    }
}
