//! Application assembly errors.

use middle_config::ConfigError;
use middle_router::RouterError;
use thiserror::Error;

/// Errors raised while configuring or assembling an application.
///
/// Request-time failures use [`middle_core::Error`] instead.
#[derive(Error, Debug)]
pub enum MiddleError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A route could not be registered.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// A JSON content-type pattern is not a valid regex.
    #[error("invalid JSON content-type pattern: {0}")]
    ContentType(#[from] regex::Error),

    /// The global subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}
