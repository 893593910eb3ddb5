//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements. A middleware receives the request and the [`RequestHandler`]
//! for the rest of the stack. It may change the request before delegating,
//! change the response afterwards, or answer on its own without delegating.
//!
//! # Example
//!
//! ```
//! use middle_core::{Error, Request, Response};
//! use middle_pipeline::{Middleware, RequestHandler};
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered_by"
//!     }
//!
//!     fn process(
//!         &self,
//!         request: Request,
//!         handler: &mut RequestHandler,
//!     ) -> Result<Response, Error> {
//!         let mut response = handler.handle(request)?;
//!         response
//!             .headers_mut()
//!             .insert("x-powered-by", http::HeaderValue::from_static("middle"));
//!         Ok(response)
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use middle_core::{Error, Request, Response};

use crate::handler::RequestHandler;

/// The core middleware trait.
///
/// # Invariants
///
/// - `handler.handle()` may be called at most once; a second call fails with
///   [`Error::AlreadyCalled`]
/// - Errors from downstream should be propagated unless this middleware's
///   purpose is to handle them
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in log events.
    fn name(&self) -> &'static str;

    /// Processes the request, delegating to `handler` for the rest of the stack.
    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error>;
}

/// A reference-counted middleware, as stored in a stack.
///
/// Equality is identity: two values are equal when they point at the same
/// middleware instance.
#[derive(Clone)]
pub struct SharedMiddleware(Arc<dyn Middleware>);

impl SharedMiddleware {
    /// Wraps a middleware.
    pub fn new(middleware: impl Middleware) -> Self {
        Self(Arc::new(middleware))
    }

    /// Returns the wrapped middleware's name.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub(crate) fn process(
        &self,
        request: Request,
        handler: &mut RequestHandler,
    ) -> Result<Response, Error> {
        self.0.process(request, handler)
    }
}

impl<M: Middleware> From<M> for SharedMiddleware {
    fn from(middleware: M) -> Self {
        Self::new(middleware)
    }
}

impl PartialEq for SharedMiddleware {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SharedMiddleware {}

impl fmt::Debug for SharedMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedMiddleware").field(&self.name()).finish()
    }
}

/// A middleware created from a function.
///
/// # Example
///
/// ```
/// use middle_pipeline::FnMiddleware;
///
/// let middleware = FnMiddleware::new("passthrough", |request, handler| handler.handle(request));
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(Request, &mut RequestHandler) -> Result<Response, Error> + Send + Sync + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request, &mut RequestHandler) -> Result<Response, Error> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        (self.func)(request, handler)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
