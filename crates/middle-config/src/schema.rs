//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};

/// Content-type pattern recognized as JSON when none is configured.
pub const DEFAULT_JSON_CONTENT_TYPE: &str = "^application/json(;|$)";

/// Router configuration section.
///
/// # Example
///
/// ```
/// use middle_config::RouterConfig;
///
/// let config = RouterConfig {
///     base_url: "https://example.com/app".to_string(),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Absolute URL the application is served from. Its path is the mount
    /// prefix stripped from request paths.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}

/// JSON body parsing configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JsonConfig {
    /// Whether request bodies are decoded at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Regexes matched case-insensitively against the `Content-Type` header.
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            content_types: default_content_types(),
        }
    }
}

fn default_content_types() -> Vec<String> {
    vec![DEFAULT_JSON_CONTENT_TYPE.to_string()]
}

/// Error handler configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlerConfig {
    /// Whether panics below the error handler become error responses.
    #[serde(default = "default_true")]
    pub catch_panics: bool,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self { catch_panics: true }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    Json,
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether a subscriber is installed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `middle_router=debug,info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether ANSI colors are emitted.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_config_default() {
        assert_eq!(RouterConfig::default().base_url, "http://localhost");
    }

    #[test]
    fn test_json_config_default() {
        let config = JsonConfig::default();
        assert!(config.enabled);
        assert_eq!(config.content_types, ["^application/json(;|$)"]);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: LoggingConfig = toml::from_str(r#"level = "debug""#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
        let format: LogFormat = serde_json::from_str(r#""compact""#).unwrap();
        assert_eq!(format, LogFormat::Compact);
        assert!(serde_json::from_str::<LogFormat>(r#""xml""#).is_err());
    }

    #[test]
    fn test_unknown_section_field_rejected() {
        let result: Result<ErrorHandlerConfig, _> = toml::from_str("catch_everything = true");
        assert!(result.is_err());
    }
}
