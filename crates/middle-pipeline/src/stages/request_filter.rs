//! Request filtering stage.

use middle_core::{Error, Request, RequestExt, Response};

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Lets the routed controller filter the request before it continues.
///
/// Requests whose controller has no filter capability, or that carry no
/// controller at all, pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFilterMiddleware;

impl RequestFilterMiddleware {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Applies the controller's filter, if it has one.
pub(crate) fn apply_filter(request: Request) -> Request {
    let Ok(controller) = request.controller() else {
        return request;
    };
    match controller.as_filter() {
        Some(filter) => filter.filter_request(request),
        None => request,
    }
}

impl Middleware for RequestFilterMiddleware {
    fn name(&self) -> &'static str {
        "request_filter"
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        handler.handle(apply_filter(request))
    }
}
