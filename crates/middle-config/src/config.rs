//! Main configuration types.
//!
//! This module provides the top-level [`MiddleConfig`] struct and its builder.

use http::Uri;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::{ConfigError, ErrorHandlerConfig, JsonConfig, LogFormat, LoggingConfig, RouterConfig};

/// Complete application configuration.
///
/// Every section is optional in configuration files; missing sections and
/// fields take their defaults. Use [`ConfigLoader`](crate::ConfigLoader) to
/// load configuration from files and environment variables.
///
/// # Example
///
/// ```
/// use middle_config::MiddleConfig;
///
/// let config = MiddleConfig::default();
/// assert_eq!(config.router.base_url, "http://localhost");
/// assert!(config.error_handler.catch_panics);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MiddleConfig {
    /// Router configuration.
    #[serde(default)]
    pub router: RouterConfig,

    /// JSON body parsing configuration.
    #[serde(default)]
    pub json: JsonConfig,

    /// Error handler configuration.
    #[serde(default)]
    pub error_handler: ErrorHandlerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MiddleConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use middle_config::{MiddleConfig, RouterConfig};
    ///
    /// let config = MiddleConfig::builder()
    ///     .router(RouterConfig {
    ///         base_url: "https://example.com/app".to_string(),
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.router.base_url, "https://example.com/app");
    /// ```
    #[must_use]
    pub fn builder() -> MiddleConfigBuilder {
        MiddleConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The base URL is not an absolute URL
    /// - A JSON content-type pattern is not a valid regex
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.router.base_url.parse::<Uri>().map_err(|e| {
            ConfigError::invalid_value("router.base_url", format!("{}: {e}", self.router.base_url))
        })?;
        if base_url.scheme().is_none() || base_url.authority().is_none() {
            return Err(ConfigError::invalid_value(
                "router.base_url",
                format!("not an absolute URL: {}", self.router.base_url),
            ));
        }

        for pattern in &self.json.content_types {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::invalid_value("json.content_types", e.to_string()))?;
        }

        EnvFilter::try_new(&self.logging.level)
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// This preset uses debug-level pretty logs with ANSI colors.
    ///
    /// # Example
    ///
    /// ```
    /// use middle_config::MiddleConfig;
    ///
    /// let config = MiddleConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config
    }

    /// Create a production configuration preset.
    ///
    /// This preset uses info-level JSON logs.
    ///
    /// # Example
    ///
    /// ```
    /// use middle_config::{LogFormat, MiddleConfig};
    ///
    /// let config = MiddleConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config
    }
}

/// Builder for [`MiddleConfig`].
#[derive(Debug, Default)]
pub struct MiddleConfigBuilder {
    router: Option<RouterConfig>,
    json: Option<JsonConfig>,
    error_handler: Option<ErrorHandlerConfig>,
    logging: Option<LoggingConfig>,
}

impl MiddleConfigBuilder {
    /// Create a new builder with all sections defaulted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the router section.
    #[must_use]
    pub fn router(mut self, router: RouterConfig) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the JSON section.
    #[must_use]
    pub fn json(mut self, json: JsonConfig) -> Self {
        self.json = Some(json);
        self
    }

    /// Set the error handler section.
    #[must_use]
    pub fn error_handler(mut self, error_handler: ErrorHandlerConfig) -> Self {
        self.error_handler = Some(error_handler);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration without validating it.
    #[must_use]
    pub fn build(self) -> MiddleConfig {
        MiddleConfig {
            router: self.router.unwrap_or_default(),
            json: self.json.unwrap_or_default(),
            error_handler: self.error_handler.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<MiddleConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
