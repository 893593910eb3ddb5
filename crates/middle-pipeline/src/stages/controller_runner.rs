//! Terminal controller dispatch.

use middle_core::{Error, Request, RequestExt, Response};

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Executes the controller stored in the request's `controller` attribute.
///
/// This is always the innermost stage: it never delegates to the handler.
/// A missing or non-controller attribute fails with
/// [`Error::InvalidControllerType`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerRunner;

impl ControllerRunner {
    /// Creates a controller runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for ControllerRunner {
    fn name(&self) -> &'static str {
        "controller_runner"
    }

    fn process(&self, request: Request, _handler: &mut RequestHandler) -> Result<Response, Error> {
        let controller = request.controller()?;
        controller.execute(request)
    }
}
