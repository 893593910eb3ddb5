//! Combined filter-then-validate stage.

use std::fmt;
use std::sync::Arc;

use middle_core::{Error, Request, Response, ValidationFailed};

use super::request_filter::apply_filter;
use super::request_validator::{validate, Validation, ValidationErrorHandler};
use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Filters the request, then validates the filtered request.
///
/// Equivalent to [`RequestValidatorMiddleware`](super::RequestValidatorMiddleware)
/// stacked below [`RequestFilterMiddleware`](super::RequestFilterMiddleware), in
/// one stage.
pub struct FilterValidationMiddleware {
    error_handler: ValidationErrorHandler,
}

impl FilterValidationMiddleware {
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

impl Middleware for FilterValidationMiddleware {
    fn name(&self) -> &'static str {
        "filter_validation"
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        match validate(apply_filter(request))? {
            Validation::Passed(request) => handler.handle(request),
            Validation::Rejected(request, failure) => (self.error_handler)(request, failure),
        }
    }
}

impl fmt::Debug for FilterValidationMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterValidationMiddleware").finish_non_exhaustive()
    }
}
