//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::{ConfigError, LogFormat, MiddleConfig};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones field by field:
/// 1. Default values (built into the code)
/// 2. Configuration files and strings (TOML or JSON), in the order given
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use middle_config::ConfigLoader;
///
/// # fn main() -> Result<(), middle_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_file("middle.toml")?
///     .with_env_prefix("MIDDLE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    layers: Value,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&MiddleConfig::default())
    }

    /// Start from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use middle_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(self) -> Self {
        Self {
            env_prefix: self.env_prefix,
            ..Self::from_config(&MiddleConfig::development())
        }
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(self) -> Self {
        Self {
            env_prefix: self.env_prefix,
            ..Self::from_config(&MiddleConfig::production())
        }
    }

    fn from_config(config: &MiddleConfig) -> Self {
        Self {
            layers: serde_json::to_value(config).unwrap_or_else(|_| Value::Object(Map::new())),
            env_prefix: None,
        }
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by the file extension (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some(format @ ("toml" | "json")) => self.with_string(&content, format),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Load configuration from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or `json`).
    ///
    /// # Example
    ///
    /// ```
    /// use middle_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [router]
    ///     base_url = "https://example.com/app"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.router.base_url, "https://example.com/app");
    /// assert!(config.error_handler.catch_panics);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        // Typed parse first so unknown fields are reported in the source format.
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                toml::from_str::<MiddleConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<MiddleConfig>(content)?;
                serde_json::from_str(content)?
            }
            _ => return Err(ConfigError::UnsupportedFormat(format.to_string())),
        };

        merge(&mut self.layers, layer);
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `MIDDLE__ROUTER__BASE_URL` or `MIDDLE__LOGGING__FORMAT`. List values
    /// such as `MIDDLE__JSON__CONTENT_TYPES` are comma-separated.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file in the current directory or its parents.
    ///
    /// A missing file is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use middle_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().load().unwrap();
    /// assert_eq!(config.router.base_url, "http://localhost");
    /// ```
    pub fn load(self) -> Result<MiddleConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Finalize without validation.
    ///
    /// Environment overrides are still applied.
    pub fn load_unvalidated(self) -> Result<MiddleConfig, ConfigError> {
        let mut config: MiddleConfig = serde_json::from_value(self.layers)?;
        if let Some(prefix) = &self.env_prefix {
            apply_env_vars(&mut config, prefix, env::vars())?;
        }
        Ok(config)
    }
}

/// Recursively overlays `layer` onto `base`. Tables merge, everything else replaces.
fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

/// Applies `PREFIX__SECTION__KEY` overrides. Unknown keys are ignored.
fn apply_env_vars(
    config: &mut MiddleConfig,
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ConfigError> {
    let marker = format!("{prefix}__");
    for (key, value) in vars {
        let Some(path) = key.strip_prefix(&marker) else {
            continue;
        };
        let parts: Vec<&str> = path.split("__").collect();

        match parts.as_slice() {
            ["ROUTER", "BASE_URL"] => {
                config.router.base_url = value;
            }
            ["JSON", "ENABLED"] => {
                config.json.enabled = parse_bool(&value)
                    .ok_or_else(|| ConfigError::env_parse_error(&key, "expected boolean"))?;
            }
            ["JSON", "CONTENT_TYPES"] => {
                config.json.content_types = value
                    .split(',')
                    .map(str::trim)
                    .filter(|pattern| !pattern.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            ["ERROR_HANDLER", "CATCH_PANICS"] => {
                config.error_handler.catch_panics = parse_bool(&value)
                    .ok_or_else(|| ConfigError::env_parse_error(&key, "expected boolean"))?;
            }
            ["LOGGING", "ENABLED"] => {
                config.logging.enabled = parse_bool(&value)
                    .ok_or_else(|| ConfigError::env_parse_error(&key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                config.logging.level = value;
            }
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            &key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                config.logging.ansi_enabled = parse_bool(&value)
                    .ok_or_else(|| ConfigError::env_parse_error(&key, "expected boolean"))?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
