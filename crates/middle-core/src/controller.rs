//! Controller traits for request processing.
//!
//! A [`Controller`] turns a request into a response and is the last thing
//! the pipeline runs. Controllers may additionally expose two optional
//! capabilities, discovered at runtime:
//!
//! - [`RequestFilter`] normalizes the request before validation and execution
//! - [`RequestValidator`] rejects invalid requests with [`ValidationFailed`]
//!
//! [`ValidationFailed`]: crate::ValidationFailed

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::types::{Request, Response};

/// A trait for handling a request once routing has selected it.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use middle_core::{Controller, Error, Request, RequestFilter, Response};
///
/// struct HelloController;
///
/// impl Controller for HelloController {
///     fn execute(&self, request: Request) -> Result<Response, Error> {
///         Ok(Response::new(Bytes::from(format!("Hello {}", request.uri().path()))))
///     }
///
///     fn as_filter(&self) -> Option<&dyn RequestFilter> {
///         Some(self)
///     }
/// }
///
/// impl RequestFilter for HelloController {
///     fn filter_request(&self, request: Request) -> Request {
///         request
///     }
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    /// Handles the request and produces the response.
    fn execute(&self, request: Request) -> Result<Response, Error>;

    /// Returns the filter capability, if this controller has one.
    fn as_filter(&self) -> Option<&dyn RequestFilter> {
        None
    }

    /// Returns the validator capability, if this controller has one.
    fn as_validator(&self) -> Option<&dyn RequestValidator> {
        None
    }
}

/// A controller shared between routes, requests and request attributes.
pub type SharedController = Arc<dyn Controller>;

impl<C: Controller + ?Sized> Controller for Arc<C> {
    fn execute(&self, request: Request) -> Result<Response, Error> {
        (**self).execute(request)
    }

    fn as_filter(&self) -> Option<&dyn RequestFilter> {
        (**self).as_filter()
    }

    fn as_validator(&self) -> Option<&dyn RequestValidator> {
        (**self).as_validator()
    }
}

/// Optional controller capability: transform the request before it is validated.
///
/// Filtering never fails; it only normalizes (trimming, casting, defaulting).
pub trait RequestFilter {
    /// Returns the filtered request.
    fn filter_request(&self, request: Request) -> Request;
}

/// Optional controller capability: check the request before execution.
pub trait RequestValidator {
    /// Returns `Ok(())` when the request is acceptable.
    ///
    /// Rejections should be reported as [`Error::ValidationFailed`]; any
    /// other error is propagated as an unexpected failure.
    fn validate_request(&self, request: &Request) -> Result<(), Error>;
}

/// Produces a controller on demand.
///
/// Routes hold factories so that controller construction is deferred until
/// the route actually matches.
pub trait ControllerFactory: Send + Sync + 'static {
    /// Creates the controller.
    fn create(&self) -> SharedController;
}

impl<F, C> ControllerFactory for F
where
    F: Fn() -> C + Send + Sync + 'static,
    C: Controller,
{
    fn create(&self) -> SharedController {
        Arc::new(self())
    }
}

/// A function-based controller.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use middle_core::{CallableController, Controller, Request, Response};
///
/// let controller = CallableController::from_fn(|_request: Request| {
///     Ok(Response::new(Bytes::from_static(b"ok")))
/// });
///
/// let response = controller.execute(Request::new(Bytes::new())).unwrap();
/// assert_eq!(response.body(), "ok");
/// ```
pub struct CallableController<F> {
    func: F,
}

impl<F> CallableController<F>
where
    F: Fn(Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    /// Wraps a closure as a controller.
    #[must_use]
    pub const fn from_fn(func: F) -> Self {
        Self { func }
    }

    /// Wraps a closure as a shared controller.
    pub fn shared(func: F) -> SharedController {
        Arc::new(Self::from_fn(func))
    }
}

impl<F> Controller for CallableController<F>
where
    F: Fn(Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    fn execute(&self, request: Request) -> Result<Response, Error> {
        (self.func)(request)
    }
}

impl<F> fmt::Debug for CallableController<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableController").finish_non_exhaustive()
    }
}

/// A controller that builds a fresh inner controller for every execution.
///
/// Only `execute` is forwarded. Filter and validator capabilities of the
/// produced controllers are not visible through this wrapper.
pub struct FactoryController<F> {
    factory: F,
}

impl<F, C> FactoryController<F>
where
    F: Fn() -> C + Send + Sync + 'static,
    C: Controller,
{
    /// Wraps a zero-argument factory.
    #[must_use]
    pub const fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F, C> Controller for FactoryController<F>
where
    F: Fn() -> C + Send + Sync + 'static,
    C: Controller,
{
    fn execute(&self, request: Request) -> Result<Response, Error> {
        (self.factory)().execute(request)
    }
}

impl<F> fmt::Debug for FactoryController<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryController").finish_non_exhaustive()
    }
}
