// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors are turned into miette reports that point at the offending
//! line of `parley.toml`, suggest the closest known key or section, and name
//! the `PARLEY_*` variable that sets the same value.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::SECTIONS;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A top-level table Parley does not know, e.g. `[twillio]`.
    #[error("unknown configuration section `[{section}]`")]
    #[diagnostic(
        code(parley::config::unknown_section),
        help("{}", did_you_mean(suggestion.as_deref(), &SECTIONS.join(", ")))
    )]
    UnknownSection {
        section: String,
        suggestion: Option<String>,
        #[label("no such section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key inside a known section that the section does not define.
    #[error("unknown key `{key}` in `[{section}]`")]
    #[diagnostic(
        code(parley::config::unknown_key),
        help("{}", did_you_mean(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        section: String,
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys the section accepts.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type, from a file or a `PARLEY_*` variable.
    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(
        code(parley::config::invalid_type),
        help("expected {expected}; if `{env_var}` is set, check its value too")
    )]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        env_var: String,
    },

    /// A key a command needs but the configuration leaves unset.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(parley::config::missing_key),
        help("{}", missing_key_help(key))
    )]
    MissingKey { key: String },

    /// A value deserialized but violates a semantic constraint.
    #[error("validation error: {message}")]
    #[diagnostic(code(parley::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(parley::config::other))]
    Other(String),
}

fn did_you_mean(suggestion: Option<&str>, valid: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid: {valid}"),
        None => format!("valid: {valid}"),
    }
}

fn missing_key_help(key: &str) -> String {
    format!(
        "set `{key}` in parley.toml or export {}",
        env_var_for(key)
    )
}

/// The environment variable that overrides the dotted `key`
/// (`twilio.auth_token` -> `PARLEY_TWILIO_AUTH_TOKEN`).
pub fn env_var_for(key: &str) -> String {
    format!("PARLEY_{}", key.replace('.', "_").to_uppercase())
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();
    for error in err {
        let section = error.path.first().cloned();
        let converted = match (&error.kind, section) {
            (Kind::UnknownField(field, _), None) => {
                let located = locate(&error, None, &format!("[{field}]"), toml_sources);
                ConfigError::UnknownSection {
                    section: field.clone(),
                    suggestion: suggest_key(field, SECTIONS),
                    span: located.as_ref().map(|(span, _)| *span),
                    src: located.map(|(_, src)| src),
                }
            }
            (Kind::UnknownField(field, expected), Some(section)) => {
                let located = locate(&error, Some(section.as_str()), field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    section,
                    span: located.as_ref().map(|(span, _)| *span),
                    src: located.map(|(_, src)| src),
                }
            }
            (Kind::MissingField(field), section) => ConfigError::MissingKey {
                key: match section {
                    Some(section) => format!("{section}.{field}"),
                    None => field.to_string(),
                },
            },
            (Kind::InvalidType(actual, expected), _) => {
                let key = error.path.join(".");
                ConfigError::InvalidType {
                    env_var: env_var_for(&key),
                    detail: format!("found {actual}, expected {expected}"),
                    expected: expected.to_string(),
                    key,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        };
        errors.push(converted);
    }
    errors
}

/// Finds `needle` in whichever TOML file the error came from.
fn locate(
    error: &figment::error::Error,
    section: Option<&str>,
    needle: &str,
    toml_sources: &[(String, String)],
) -> Option<(SourceSpan, NamedSource<String>)> {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(
                std::fs::canonicalize(path)
                    .unwrap_or_else(|_| path.clone())
                    .display()
                    .to_string(),
            ),
            _ => None,
        });

    // Inline strings have no file origin; use the single source given.
    let (path, content) = match origin {
        Some(origin) => toml_sources.iter().find(|(p, _)| *p == origin)?,
        None if toml_sources.len() == 1 => toml_sources.first()?,
        None => return None,
    };

    let offset = match section {
        Some(section) => find_key_offset(content, section, needle)?,
        None => find_header_offset(content, needle)?,
    };
    Some((
        SourceSpan::new(offset.into(), needle.len()),
        NamedSource::new(path, content.clone()),
    ))
}

/// Byte offset of a `[section]` header line.
fn find_header_offset(content: &str, header: &str) -> Option<usize> {
    lines_with_offsets(content)
        .find(|(_, line)| line.trim() == header)
        .map(|(offset, line)| offset + (line.len() - line.trim_start().len()))
}

/// Byte offset of `key` inside the `[section]` table of TOML `content`.
///
/// Only lines between that header and the next header are searched.
pub fn find_key_offset(content: &str, section: &str, key: &str) -> Option<usize> {
    let header = format!("[{section}]");
    let mut in_section = false;

    for (offset, line) in lines_with_offsets(content) {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_section = trimmed.trim_end() == header;
            continue;
        }
        if !in_section {
            continue;
        }
        let Some(rest) = trimmed.strip_prefix(key) else {
            continue;
        };
        if rest.trim_start().starts_with('=') {
            return Some(offset + (line.len() - trimmed.len()));
        }
    }
    None
}

fn lines_with_offsets(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content.split_inclusive('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line.trim_end_matches(['\n', '\r'])))
    })
}

/// Closest known name above the similarity threshold, if any.
pub fn suggest_key(unknown: &str, valid: &[&str]) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for &candidate in valid {
        let score = strsim::jaro_winkler(unknown, candidate);
        if score > SUGGESTION_THRESHOLD && best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// Print every error to stderr as a miette report, after a one-line count.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let noun = if errors.len() == 1 { "error" } else { "errors" };
    eprintln!("parley: {} configuration {noun}", errors.len());

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut report = String::new();
        match handler.render_report(&mut report, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{report}"),
            Err(_) => eprintln!("  {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_twilio_keys() {
        let valid = &["account_sid", "auth_token", "phone_number"];
        assert_eq!(
            suggest_key("acount_sid", valid),
            Some("account_sid".to_string())
        );
        assert_eq!(
            suggest_key("auth_tokn", valid),
            Some("auth_token".to_string())
        );
    }

    #[test]
    fn suggests_sections() {
        assert_eq!(suggest_key("twillio", SECTIONS), Some("twilio".to_string()));
        assert_eq!(suggest_key("zzzzzz", SECTIONS), None);
    }

    #[test]
    fn env_var_names_follow_loader_mapping() {
        assert_eq!(env_var_for("twilio.auth_token"), "PARLEY_TWILIO_AUTH_TOKEN");
        assert_eq!(env_var_for("server.port"), "PARLEY_SERVER_PORT");
        assert!(missing_key_help("twilio.account_sid").contains("PARLEY_TWILIO_ACCOUNT_SID"));
    }

    #[test]
    fn key_offset_is_scoped_to_its_section() {
        let content = "[agent]\nlog_level = \"info\"\n\n[routing]\nprefer_locl = true\n";
        let o = find_key_offset(content, "routing", "prefer_locl").unwrap();
        assert_eq!(&content[o..o + "prefer_locl".len()], "prefer_locl");

        let content = "[ollama]\nurl = \"http://x\"\n\n[edge]\nenabled = true\n";
        assert_eq!(find_key_offset(content, "edge", "url"), None);
    }

    #[test]
    fn key_prefix_does_not_match_longer_key() {
        let content = "[ollama]\nurl_backup = \"x\"\nurl = \"y\"\n";
        let o = find_key_offset(content, "ollama", "url").unwrap();
        assert_eq!(&content[o..o + 5], "url =");
    }

    #[test]
    fn header_offset_points_at_section() {
        let content = "[agent]\n\n  [twillio]\nx = 1\n";
        let o = find_header_offset(content, "[twillio]").unwrap();
        assert_eq!(&content[o..o + 9], "[twillio]");
    }

    #[test]
    fn misspelled_section_is_an_unknown_section() {
        let content = "[agent]\nlog_level = \"info\"\n\n[twillio]\nsid = 1\n";
        let err = crate::loader::load_config_from_str(content).unwrap_err();
        let sources = vec![("<inline>".to_string(), content.to_string())];
        let errors = figment_to_config_errors(err, &sources);

        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownSection { section, suggestion: Some(s), span: Some(_), .. }
                if section == "twillio" && s == "twilio"
        )));
    }

    #[test]
    fn invalid_type_names_the_override_variable() {
        let content = "[server]\nport = \"eighty\"\n";
        let err = crate::loader::load_config_from_str(content).unwrap_err();
        let errors = figment_to_config_errors(err, &[]);

        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidType { key, env_var, .. }
                if key == "server.port" && env_var == "PARLEY_SERVER_PORT"
        )));
    }
}
