// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as well-formed URLs, positive timeouts, and E.164 phone numbers.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.to_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.agent.log_level
            ),
        });
    }

    // An empty Ollama URL disables the local backend.
    if !config.ollama.url.trim().is_empty() && !is_http_url(&config.ollama.url) {
        errors.push(invalid_url("ollama.url", &config.ollama.url));
    }

    if config.edge.enabled && !is_http_url(&config.edge.url) {
        errors.push(invalid_url("edge.url", &config.edge.url));
    }

    if config.routing.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "routing.request_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.routing.probe_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "routing.probe_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.routing.conversation_idle_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "routing.conversation_idle_secs must be greater than 0".to_string(),
        });
    }

    if config.routing.max_history < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "routing.max_history must be at least 2 (one exchange), got {}",
                config.routing.max_history
            ),
        });
    }

    if config.anthropic.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "anthropic.max_tokens must be greater than 0".to_string(),
        });
    }

    if let Some(number) = &config.twilio.phone_number
        && !is_e164(number)
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "twilio.phone_number `{number}` is not in E.164 form (e.g. +14155550100)"
            ),
        });
    }

    if config.twilio.validate_requests {
        match &config.twilio.public_url {
            Some(url) if is_http_url(url) => {}
            Some(url) => errors.push(invalid_url("twilio.public_url", url)),
            None => errors.push(ConfigError::Validation {
                message: "twilio.public_url is required when twilio.validate_requests is on"
                    .to_string(),
            }),
        }
    }

    if config.server.port == 0 {
        errors.push(ConfigError::Validation {
            message: "server.port must not be 0".to_string(),
        });
    }

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks the settings only `parley serve` needs: Twilio credentials.
pub fn validate_for_serve(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let required = [
        ("twilio.account_sid", &config.twilio.account_sid),
        ("twilio.auth_token", &config.twilio.auth_token),
        ("twilio.phone_number", &config.twilio.phone_number),
    ];

    let errors: Vec<ConfigError> = required
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(key, _)| ConfigError::MissingKey {
            key: key.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid_url(key: &str, value: &str) -> ConfigError {
    ConfigError::Validation {
        message: format!("{key} `{value}` must be an http:// or https:// URL"),
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

/// `+` followed by 8 to 15 digits, the first non-zero.
fn is_e164(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn zero_timeouts_fail_validation() {
        let mut config = ParleyConfig::default();
        config.routing.request_timeout_secs = 0;
        config.routing.probe_timeout_secs = 0;
        config.routing.conversation_idle_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "request_timeout_secs"));
        assert!(has_message(&errors, "probe_timeout_secs"));
        assert!(has_message(&errors, "conversation_idle_secs"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ParleyConfig::default();
        config.agent.log_level = "loud".into();
        config.routing.max_history = 1;
        config.ollama.url = "ftp://nas".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_ollama_url_disables_local_without_error() {
        let mut config = ParleyConfig::default();
        config.ollama.url = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn disabled_edge_url_is_not_checked() {
        let mut config = ParleyConfig::default();
        config.edge.enabled = false;
        config.edge.url = "not a url".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn phone_number_must_be_e164() {
        let mut config = ParleyConfig::default();
        config.twilio.phone_number = Some("415-555-0100".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "E.164"));

        config.twilio.phone_number = Some("+14155550100".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn signature_validation_requires_public_url() {
        let mut config = ParleyConfig::default();
        config.twilio.validate_requests = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "public_url"));

        config.twilio.public_url = Some("https://phone.example.com".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn serve_requires_twilio_credentials() {
        let mut config = ParleyConfig::default();
        let errors = validate_for_serve(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::MissingKey { key } if key == "twilio.auth_token")
        ));

        config.twilio.account_sid = Some("AC123".into());
        config.twilio.auth_token = Some("token".into());
        config.twilio.phone_number = Some("+14155550100".into());
        assert!(validate_for_serve(&config).is_ok());
    }

    #[test]
    fn url_and_phone_helpers() {
        assert!(is_http_url("http://192.168.0.234:11434"));
        assert!(is_http_url("https://gateway.example.com"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("localhost:11434"));
        assert!(is_e164("+447700900123"));
        assert!(!is_e164("+0123456789"));
        assert!(!is_e164("+1415"));
    }
}
