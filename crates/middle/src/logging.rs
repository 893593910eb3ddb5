//! Global subscriber installation.
//!
//! Components log through `tracing`; this module installs the process-wide
//! subscriber that receives those events, configured from a [`LoggingConfig`].
//!
//! # Example
//!
//! ```no_run
//! use middle::logging::init_logging;
//! use middle_config::LoggingConfig;
//!
//! init_logging(&LoggingConfig::default()).unwrap();
//! tracing::info!(route = "home", "request served");
//! ```

use middle_config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::MiddleError;

/// Installs the global subscriber described by `config`.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns `MiddleError::LoggingInit` if the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), MiddleError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let layer = tracing_subscriber::fmt::layer().with_ansi(config.ansi_enabled);
    let layer = match config.format {
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
        LogFormat::Pretty => layer.pretty().with_filter(filter).boxed(),
        LogFormat::Compact => layer.compact().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| MiddleError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a directive string such as `info` or
/// `middle_router=debug,warn`.
pub fn create_env_filter(filter: &str) -> Result<EnvFilter, MiddleError> {
    EnvFilter::try_new(filter)
        .map_err(|e| MiddleError::LoggingInit(format!("invalid log level: {e}")))
}
