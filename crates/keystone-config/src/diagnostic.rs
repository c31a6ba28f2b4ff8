// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with "did you mean?" suggestions.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a key suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with diagnostic information for rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(keystone::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(keystone::config::invalid_type))]
    InvalidType { key: String, detail: String },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(keystone::config::missing_key),
        help("add `{key} = <value>` to the server configuration file")
    )]
    MissingKey { key: String },

    /// A semantic validation failure.
    #[error("validation error: {message}")]
    #[diagnostic(code(keystone::config::validation))]
    Validation { message: String },

    /// Anything else figment reports.
    #[error("configuration error: {0}")]
    #[diagnostic(code(keystone::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
///
/// `source` is the `(path, content)` of the file that was loaded, used to
/// point at the offending key.
pub fn figment_to_config_errors(
    err: figment::Error,
    source: Option<(&str, &str)>,
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let valid: Vec<&str> = expected.to_vec();
                    let table = table_path(&path, field);
                    let (span, src) = source
                        .and_then(|(name, content)| {
                            find_key_offset(content, table, field).map(|offset| {
                                (
                                    Some(SourceSpan::new(offset.into(), field.len())),
                                    Some(NamedSource::new(name, content.to_string())),
                                )
                            })
                        })
                        .unwrap_or((None, None));
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, &valid),
                        valid_keys: valid.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                },
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: path.join("."),
                    detail: format!("found {actual}, expected {expected}"),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// The table holding `field`: figment reports unknown-field paths with the
/// field itself as the last segment.
fn table_path<'a>(path: &'a [String], field: &str) -> &'a [String] {
    match path.split_last() {
        Some((last, table)) if last == field => table,
        _ => path,
    }
}

/// Find the byte offset of `field` inside the table at `path`.
///
/// For `path = ["plugins", "DataStore", "sql"]` the search starts after the
/// `[plugins.DataStore.sql]` header; an empty path searches from the top.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = if path.is_empty() {
        0
    } else {
        let header = format!("[{}]", path.join("."));
        content.find(&header)? + header.len()
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && offset != start {
            break;
        }
        if let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Suggest the closest valid key using Jaro-Winkler similarity.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error as &dyn Diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_trust_domain_for_typo() {
        let valid = &["trust_domain", "log_level"];
        assert_eq!(
            suggest_key("trust_domian", valid),
            Some("trust_domain".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["trust_domain", "log_level"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn finds_key_inside_nested_plugin_table() {
        let content = "[server]\nplugin_dta = 1\n\n[plugins.DataStore.sql]\nplugin_dta = {}\n";
        let path = vec![
            "plugins".to_string(),
            "DataStore".to_string(),
            "sql".to_string(),
        ];
        let offset = find_key_offset(content, &path, "plugin_dta").unwrap();
        assert!(offset > content.find("[plugins").unwrap());
        assert_eq!(&content[offset..offset + 10], "plugin_dta");
    }

    #[test]
    fn missing_section_yields_no_offset() {
        let path = vec!["telemetry".to_string()];
        assert_eq!(find_key_offset("[server]\n", &path, "x"), None);
    }

    #[test]
    fn unknown_field_path_resolves_to_its_table() {
        let content = "[server]\ntrust_domian = \"example.org\"\n";
        let path = vec!["server".to_string(), "trust_domian".to_string()];
        let table = table_path(&path, "trust_domian");
        assert_eq!(table, ["server".to_string()]);
        let offset = find_key_offset(content, table, "trust_domian").unwrap();
        assert_eq!(&content[offset..offset + 12], "trust_domian");
    }
}
