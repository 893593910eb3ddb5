//! # Middle
//!
//! **A middleware pipeline for synchronous HTTP request handling**
//!
//! Middle runs every request through a stack of interchangeable middleware
//! that ends in a controller:
//!
//! - **Immutable stacks** – adding or removing middleware yields a new stack
//! - **Run-once continuations** – each middleware may delegate exactly once
//! - **Named routes** – method sets, requirements, host constraints and URL generation
//! - **Controller capabilities** – controllers may filter and validate their own input
//! - **Typed configuration** – TOML/JSON files layered with environment overrides
//!
//! ## Quick Start
//!
//! ```
//! use bytes::Bytes;
//! use http::StatusCode;
//! use middle::prelude::*;
//!
//! let app = Application::builder()
//!     .config(MiddleConfig::development())
//!     .routes(|router: &mut Router| -> Result<(), RouterError> {
//!         router.get(
//!             "hello",
//!             "/hello/{name}",
//!             || {
//!                 CallableController::from_fn(|request: Request| {
//!                     let name = request.param("name").unwrap_or("stranger").to_string();
//!                     Ok(Response::text(StatusCode::OK, format!("Hello, {name}!")))
//!                 })
//!             },
//!             RouteOptions::new(),
//!         )
//!     })
//!     .build()
//!     .unwrap();
//!
//! let request = http::Request::get("/hello/world").body(Bytes::new()).unwrap();
//! let response = app.handle(request).unwrap();
//! assert_eq!(response.body(), "Hello, world!");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → ErrorHandler → JsonParser → Session → Routing → FilterValidation → ControllerRunner
//!                                                                                   ↓
//! Response ←────────────────────────────────────────────────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/middle/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod error;
pub mod logging;

pub use application::{Application, ApplicationBuilder};
pub use error::MiddleError;

// Re-export core types
pub use middle_core as core;

// Re-export router types
pub use middle_router as router;

// Re-export pipeline types
pub use middle_pipeline as pipeline;

// Re-export configuration types
pub use middle_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use middle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Application, ApplicationBuilder, MiddleError};

    pub use middle_core::{
        CallableController, Controller, Error, FactoryController, JsonRenderer, RedirectRenderer,
        Renderer, RenderingController, Request, RequestExt, RequestFilter, RequestValidator,
        Response, ResponseExt, Session, SharedController, SharedRenderer, ValidationFailed, View,
        ViewController,
    };

    pub use middle_router::{RouteMatch, RouteOptions, Router, RouterError, UrlGenerator};

    pub use middle_pipeline::stages::{
        ControllerRunner, ErrorHandlerMiddleware, FilterValidationMiddleware,
        JsonRequestParserMiddleware, MemorySessionProcessor, RequestFilterMiddleware,
        RequestValidatorMiddleware, RoutingMiddleware, SessionMiddleware, SessionProcessor,
    };
    pub use middle_pipeline::{ApplicationStack, FnMiddleware, Middleware, RequestHandler};

    pub use middle_config::{ConfigLoader, MiddleConfig};
}
