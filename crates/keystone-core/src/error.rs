// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Keystone trust server.

use thiserror::Error;

use crate::types::PluginKind;

/// Boxed error used as the source of wrapped plugin failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad classification of a [`KeystoneError`].
///
/// Load-time failures fall into the first three categories; everything else
/// happens while the server is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Structural problems with the supplied configuration.
    Configuration,
    /// Failures surfaced by the generic plugin loader.
    Loader,
    /// A directly bootstrapped subsystem rejected its configuration.
    SubsystemConfiguration,
    /// Errors returned by subsystems while serving calls.
    Runtime,
}

/// The primary error type used across all Keystone plugin traits and the catalog.
#[derive(Debug, Error)]
pub enum KeystoneError {
    /// Malformed or structurally invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A plugin kind restricted to one built-in was configured with something else.
    #[error(
        "unsupported {kind} plugin `{name}`: pluggability for the {kind} is deprecated; only the built-in `{builtin}` plugin is supported"
    )]
    UnsupportedPlugin {
        kind: PluginKind,
        name: String,
        builtin: String,
    },

    /// Two plugins of the same kind resolved to the same name.
    #[error("configuration error: duplicate {kind} plugin named `{name}`")]
    DuplicatePlugin { kind: PluginKind, name: String },

    /// The plugin loader could not resolve or wire the configured plugins.
    #[error("plugin loader error: {0}")]
    Loader(String),

    /// A plugin created by the loader rejected its configuration.
    #[error("failed to configure {kind} plugin `{name}`: {source}")]
    PluginConfigure {
        kind: PluginKind,
        name: String,
        source: BoxError,
    },

    /// A directly bootstrapped subsystem rejected its configuration.
    #[error("failed to configure {kind} `{name}`: {source}")]
    SubsystemConfigure {
        kind: PluginKind,
        name: String,
        source: BoxError,
    },

    /// Datastore backend errors (connection, query failure, serialization).
    #[error("datastore error: {source}")]
    DataStore { source: BoxError },

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The record being created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The caller supplied an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A plugin failed while serving a call.
    #[error("{kind} plugin `{name}`: {message}")]
    Plugin {
        kind: PluginKind,
        name: String,
        message: String,
    },

    /// One or more release callbacks failed during shutdown.
    #[error("failed to release {} resource(s): {}", .0.len(), .0.join("; "))]
    Release(Vec<String>),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KeystoneError {
    /// Wrap a plugin runtime failure.
    pub fn plugin(kind: PluginKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        KeystoneError::Plugin {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            KeystoneError::Config(_)
            | KeystoneError::UnsupportedPlugin { .. }
            | KeystoneError::DuplicatePlugin { .. } => ErrorCategory::Configuration,
            KeystoneError::Loader(_) | KeystoneError::PluginConfigure { .. } => {
                ErrorCategory::Loader
            }
            KeystoneError::SubsystemConfigure { .. } => ErrorCategory::SubsystemConfiguration,
            _ => ErrorCategory::Runtime,
        }
    }

    /// True for configuration-category errors.
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Short, stable code used as the `status` label on call metrics.
    pub fn code(&self) -> &'static str {
        match self {
            KeystoneError::Config(_) => "config",
            KeystoneError::UnsupportedPlugin { .. } => "unsupported_plugin",
            KeystoneError::DuplicatePlugin { .. } => "duplicate_plugin",
            KeystoneError::Loader(_) => "loader",
            KeystoneError::PluginConfigure { .. } => "plugin_configure",
            KeystoneError::SubsystemConfigure { .. } => "subsystem_configure",
            KeystoneError::DataStore { .. } => "datastore",
            KeystoneError::NotFound(_) => "not_found",
            KeystoneError::AlreadyExists(_) => "already_exists",
            KeystoneError::InvalidArgument(_) => "invalid_argument",
            KeystoneError::Plugin { .. } => "plugin",
            KeystoneError::Release(_) => "release",
            KeystoneError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_match_load_time_taxonomy() {
        assert_eq!(
            KeystoneError::Config("x".into()).category(),
            ErrorCategory::Configuration
        );
        let unsupported = KeystoneError::UnsupportedPlugin {
            kind: PluginKind::DataStore,
            name: "postgres".into(),
            builtin: "sql".into(),
        };
        assert!(unsupported.is_configuration());
        assert_eq!(
            KeystoneError::Loader("x".into()).category(),
            ErrorCategory::Loader
        );
        let subsystem = KeystoneError::SubsystemConfigure {
            kind: PluginKind::DataStore,
            name: "sql".into(),
            source: "bad".into(),
        };
        assert_eq!(subsystem.category(), ErrorCategory::SubsystemConfiguration);
        assert_eq!(
            KeystoneError::NotFound("x".into()).category(),
            ErrorCategory::Runtime
        );
    }

    #[test]
    fn unsupported_plugin_message_names_kind_and_builtin() {
        let err = KeystoneError::UnsupportedPlugin {
            kind: PluginKind::DataStore,
            name: "postgres".into(),
            builtin: "sql".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DataStore"));
        assert!(msg.contains("`sql`"));
    }

    #[test]
    fn release_error_lists_every_failure() {
        let err = KeystoneError::Release(vec!["a: boom".into(), "b: bang".into()]);
        assert_eq!(
            err.to_string(),
            "failed to release 2 resource(s): a: boom; b: bang"
        );
    }
}
