//! # Middle Core
//!
//! Core types and traits for the Middle request pipeline.
//!
//! This crate provides the foundational types used throughout Middle:
//!
//! - [`Request`] / [`Response`] - Buffered HTTP messages
//! - [`Controller`] - The final request handler, with optional
//!   [`RequestFilter`] and [`RequestValidator`] capabilities
//! - [`RequestExt`] - Named request attributes (controller, route params, session, error)
//! - [`Error`] - Standard error type
//! - [`Session`] - Session abstraction and the in-memory [`MemorySession`]
//! - [`Logger`] - Subscriber handle used by pipeline components
//! - [`View`] / [`Renderer`] - View results of [`ViewController`]s and their rendering

#![doc(html_root_url = "https://docs.rs/middle-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod attributes;
mod controller;
mod error;
mod logger;
mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod types;
mod view;

pub use attributes::{
    Attribute, Attributes, RequestExt, CONTROLLER_ATTRIBUTE, ERROR_ATTRIBUTE, SESSION_ATTRIBUTE,
};
pub use controller::{
    CallableController, Controller, ControllerFactory, FactoryController, RequestFilter,
    RequestValidator, SharedController,
};
pub use error::{DomainErrorKind, Error, ErrorDetail, ErrorEnvelope, Result, ValidationFailed};
pub use logger::{log_with, Logger};
pub use session::{MemorySession, Session, SharedSession, FLASH_DATA_PREFIX, FLASH_KEYS_KEY};
pub use types::{Request, Response, ResponseExt};
pub use view::{
    create_response, JsonRenderer, RedirectRenderer, Renderer, RenderingController,
    SharedRenderer, View, ViewController, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON,
};
