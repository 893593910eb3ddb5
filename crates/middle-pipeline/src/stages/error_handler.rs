//! Error handling stage.
//!
//! Sits near the top of the stack so that every failure below it, panics
//! included, is logged and turned into a response by an error controller.
//!
//! # Pipeline Position
//!
//! ```text
//! [ErrorHandler] → JsonParser → Routing → FilterValidation → ControllerRunner
//! ```
//!
//! # Example
//!
//! ```
//! use middle_core::{CallableController, RequestExt, Response, ResponseExt};
//! use middle_pipeline::stages::ErrorHandlerMiddleware;
//!
//! let error_page = CallableController::from_fn(|request| {
//!     let error = request.error().expect("error attribute is set");
//!     Ok(Response::from_error(error))
//! });
//! let stage = ErrorHandlerMiddleware::new(error_page).catch_panics(false);
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use middle_core::{
    log_with, Controller, Error, Logger, Request, RequestExt, Response, SharedController,
    ERROR_ATTRIBUTE,
};
use tracing::error;

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Converts failures of the rest of the stack into an error controller's response.
///
/// The error controller receives the request as it arrived at this stage, with
/// the error stored under [`ERROR_ATTRIBUTE`]. Failures of the error controller
/// itself propagate.
pub struct ErrorHandlerMiddleware {
    error_controller: SharedController,
    logger: Option<Logger>,
    catch_panics: bool,
}

impl ErrorHandlerMiddleware {
    /// Creates the stage with the controller that renders errors.
    pub fn new(error_controller: impl Controller) -> Self {
        Self {
            error_controller: Arc::new(error_controller),
            logger: None,
            catch_panics: true,
        }
    }

    /// Logs caught errors through `logger` instead of the ambient subscriber.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets whether panics below this stage are caught. Enabled by default.
    #[must_use]
    pub const fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    fn run_rest(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        if !self.catch_panics {
            return handler.handle(request);
        }
        panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request))).unwrap_or_else(
            |payload| {
                Err(Error::Panic {
                    message: panic_message(payload.as_ref()),
                })
            },
        )
    }

    fn log(&self, error: &Error) {
        let location = error
            .location()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        log_with(self.logger.as_ref(), || {
            error!(
                severity = "alert",
                code = error.code(),
                location = %location,
                trace = ?error.chain(),
                "{error}"
            );
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with a non-string payload".to_string())
}

impl Middleware for ErrorHandlerMiddleware {
    fn name(&self) -> &'static str {
        "error_handler"
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        let original = request.clone();
        match self.run_rest(request, handler) {
            Ok(response) => Ok(response),
            Err(error) => {
                self.log(&error);
                self.error_controller
                    .execute(original.with_attribute(ERROR_ATTRIBUTE, error))
            }
        }
    }
}

impl fmt::Debug for ErrorHandlerMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlerMiddleware")
            .field("catch_panics", &self.catch_panics)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{FnMiddleware, SharedMiddleware};
    use bytes::Bytes;
    use http::StatusCode;
    use middle_core::testing::LogCapture;
    use middle_core::{CallableController, ResponseExt};

    fn error_page(
    ) -> CallableController<impl Fn(Request) -> Result<Response, Error> + Send + Sync + 'static>
    {
        CallableController::from_fn(|request: Request| match request.error() {
            Some(error) => Ok(Response::from_error(error)),
            None => Ok(Response::text(StatusCode::OK, "no error")),
        })
    }

    fn failing(error: fn() -> Error) -> SharedMiddleware {
        FnMiddleware::new("failing", move |_request, _handler| Err(error())).into()
    }

    fn panicking() -> SharedMiddleware {
        FnMiddleware::new("panicking", |_request, _handler| -> Result<Response, Error> {
            panic!("controller exploded")
        })
        .into()
    }

    #[test]
    fn test_success_passes_through() {
        let ok: SharedMiddleware = FnMiddleware::new("ok", |_request, _handler| {
            Ok(Response::text(StatusCode::CREATED, "made"))
        })
        .into();
        let mut handler = RequestHandler::new(vec![ok]);
        let response = ErrorHandlerMiddleware::new(error_page())
            .process(Request::new(Bytes::new()), &mut handler)
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_error_is_rendered_by_error_controller() {
        let mut handler = RequestHandler::new(vec![failing(|| Error::not_found("no such user"))]);
        let response = ErrorHandlerMiddleware::new(error_page())
            .process(Request::new(Bytes::new()), &mut handler)
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(String::from_utf8_lossy(response.body()).contains("no such user"));
    }

    #[test]
    fn test_error_controller_sees_original_request() {
        let mutate: SharedMiddleware = FnMiddleware::new("mutate", |request: Request, handler| {
            handler.handle(request.with_attribute("added", "below"))
        })
        .into();
        let controller = CallableController::from_fn(|request: Request| {
            assert!(request.attribute("added").is_none());
            assert!(request.error().is_some());
            Ok(Response::empty(StatusCode::IM_A_TEAPOT))
        });

        let mut handler = RequestHandler::new(vec![failing(|| Error::msg("boom")), mutate]);
        let response = ErrorHandlerMiddleware::new(controller)
            .process(Request::new(Bytes::new()), &mut handler)
            .unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_panic_becomes_error() {
        let mut handler = RequestHandler::new(vec![panicking()]);
        let response = ErrorHandlerMiddleware::new(error_page())
            .process(Request::new(Bytes::new()), &mut handler)
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(String::from_utf8_lossy(response.body()).contains("PANIC"));
    }

    #[test]
    fn test_panics_propagate_when_disabled() {
        let stage = ErrorHandlerMiddleware::new(error_page()).catch_panics(false);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut handler = RequestHandler::new(vec![panicking()]);
            stage.process(Request::new(Bytes::new()), &mut handler)
        }));
        assert!(outcome.is_err());
    }

    #[test]
    fn test_error_controller_failure_propagates() {
        let controller =
            CallableController::from_fn(|_request| Err(Error::msg("error page is broken")));
        let mut handler = RequestHandler::new(vec![failing(|| Error::msg("boom"))]);
        let err = ErrorHandlerMiddleware::new(controller)
            .process(Request::new(Bytes::new()), &mut handler)
            .unwrap_err();
        assert_eq!(err.to_string(), "error page is broken");
    }

    #[test]
    fn test_errors_are_logged_as_alerts() {
        let capture = LogCapture::new();
        let logger = capture.logger();

        let mut handler = RequestHandler::new(vec![failing(|| Error::msg("disk on fire"))]);
        ErrorHandlerMiddleware::new(error_page())
            .with_logger(logger)
            .process(Request::new(Bytes::new()), &mut handler)
            .unwrap();

        let output = capture.contents();
        assert!(output.contains("ERROR"));
        assert!(output.contains("disk on fire"));
        assert!(output.contains("severity=\"alert\""));
        assert!(output.contains("error_handler.rs"));
    }
}
