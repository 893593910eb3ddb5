//! Request validation stage.

use std::fmt;
use std::sync::Arc;

use middle_core::{Error, Request, RequestExt, Response, ValidationFailed};
use tracing::debug;

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Turns a validation failure into a response.
pub type ValidationErrorHandler =
    Arc<dyn Fn(Request, ValidationFailed) -> Result<Response, Error> + Send + Sync>;

/// Outcome of running a controller's validator.
pub(crate) enum Validation {
    Passed(Request),
    Rejected(Request, ValidationFailed),
}

/// Runs the controller's validator, if it has one.
///
/// Only [`Error::ValidationFailed`] counts as a rejection; other errors propagate.
pub(crate) fn validate(request: Request) -> Result<Validation, Error> {
    let Ok(controller) = request.controller() else {
        return Ok(Validation::Passed(request));
    };
    let Some(validator) = controller.as_validator() else {
        return Ok(Validation::Passed(request));
    };

    match validator.validate_request(&request) {
        Ok(()) => Ok(Validation::Passed(request)),
        Err(Error::ValidationFailed(failure)) => {
            debug!(
                fields = ?failure.errors().keys().collect::<Vec<_>>(),
                "request failed validation"
            );
            Ok(Validation::Rejected(request, failure))
        }
        Err(error) => Err(error),
    }
}

/// Validates the request with the routed controller's validator.
///
/// On [`ValidationFailed`] the configured error handler produces the response
/// and the rest of the stack is skipped.
pub struct RequestValidatorMiddleware {
    error_handler: ValidationErrorHandler,
}

impl RequestValidatorMiddleware {
    /// Creates the stage with the handler for rejected requests.
    pub fn new<F>(error_handler: F) -> Self
    where
        F: Fn(Request, ValidationFailed) -> Result<Response, Error> + Send + Sync + 'static,
    {
        Self {
            error_handler: Arc::new(error_handler),
        }
    }
}

impl Middleware for RequestValidatorMiddleware {
    fn name(&self) -> &'static str {
        "request_validator"
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        match validate(request)? {
            Validation::Passed(request) => handler.handle(request),
            Validation::Rejected(request, failure) => (self.error_handler)(request, failure),
        }
    }
}

impl fmt::Debug for RequestValidatorMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestValidatorMiddleware").finish_non_exhaustive()
    }
}
