//! Typed configuration for Middle applications.
//!
//! This crate provides a strongly-typed configuration with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → files → env)
//!
//! # Overview
//!
//! [`MiddleConfig`] holds one section per configurable part of the pipeline:
//!
//! - [`RouterConfig`] - Base URL and mount prefix
//! - [`JsonConfig`] - Content types decoded as JSON
//! - [`ErrorHandlerConfig`] - Panic capture
//! - [`LoggingConfig`] - Subscriber level and format
//!
//! # Example
//!
//! ```no_run
//! use middle_config::ConfigLoader;
//!
//! # fn main() -> Result<(), middle_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("middle.toml")?
//!     .with_env_prefix("MIDDLE")
//!     .load()?;
//!
//! println!("Serving from: {}", config.router.base_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [router]
//! base_url = "http://localhost"
//!
//! [json]
//! enabled = true
//! content_types = ["^application/json(;|$)"]
//!
//! [error_handler]
//! catch_panics = true
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "pretty"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `MIDDLE__ROUTER__BASE_URL=https://example.com/app`
//! - `MIDDLE__ERROR_HANDLER__CATCH_PANICS=false`
//! - `MIDDLE__LOGGING__FORMAT=json`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{MiddleConfig, MiddleConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
