//! # Middle Pipeline
//!
//! The middleware stack and the single-use continuation that drives it.
//!
//! An [`ApplicationStack`] holds middleware bottom to top. Processing a
//! request hands the top middleware a [`RequestHandler`] over the rest of the
//! stack; each middleware either answers on its own or calls the handler once
//! to continue down the chain.
//!
//! ```text
//! Request → ErrorHandler → JsonParser → Routing → FilterValidation → ControllerRunner
//!                                                                          ↓
//! Response ←───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **LIFO order**: the most recently added middleware runs first
//! - **Immutable stacks**: adding or removing middleware returns a new stack
//! - **Run-once continuations**: a [`RequestHandler`] refuses a second call
//! - **Sync**: middleware is a plain function of request to response
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use http::StatusCode;
//! use middle_core::{CallableController, Response, ResponseExt};
//! use middle_pipeline::stages::{ControllerRunner, RoutingMiddleware};
//! use middle_pipeline::{ApplicationStack, SharedMiddleware};
//! use middle_router::{RouteOptions, Router};
//!
//! let mut router = Router::new("http://localhost").unwrap();
//! router
//!     .get(
//!         "home",
//!         "/",
//!         || CallableController::from_fn(|_| Ok(Response::text(StatusCode::OK, "home"))),
//!         RouteOptions::new(),
//!     )
//!     .unwrap();
//! let fallback = CallableController::from_fn(|_| Ok(Response::empty(StatusCode::NOT_FOUND)));
//!
//! let stack = ApplicationStack::new([SharedMiddleware::from(ControllerRunner::new())])
//!     .with_middleware(RoutingMiddleware::new(router, fallback));
//!
//! let request = http::Request::get("/").body(Bytes::new()).unwrap();
//! let response = stack.process(request).unwrap();
//! assert_eq!(response.body(), "home");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod handler;
pub mod middleware;
pub mod stack;
pub mod stages;

pub use handler::RequestHandler;
pub use middleware::{FnMiddleware, Middleware, SharedMiddleware};
pub use stack::ApplicationStack;

pub use middle_core::{Error, Logger, Request, Response, ResponseExt};
