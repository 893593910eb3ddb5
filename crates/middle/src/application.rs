//! Application assembly.
//!
//! An [`Application`] is an [`ApplicationStack`] wired in the conventional
//! order, top of the stack first:
//!
//! ```text
//! ErrorHandler → JsonParser → Session? → Routing → FilterValidation → ControllerRunner
//! ```
//!
//! The JSON parser is skipped when `json.enabled` is false and the session
//! stage is present only when a [`SessionProcessor`] is supplied.

use std::fmt;
use std::sync::Arc;

use middle_config::MiddleConfig;
use middle_core::{
    CallableController, Controller, Error, Logger, Request, RequestExt, Response, ResponseExt,
    SharedController, ValidationFailed,
};
use middle_pipeline::stages::{
    ControllerRunner, ErrorHandlerMiddleware, FilterValidationMiddleware,
    JsonRequestParserMiddleware, RoutingMiddleware, SessionMiddleware, SessionProcessor,
};
use middle_pipeline::{ApplicationStack, SharedMiddleware};
use middle_router::{Router, RoutingProvider, RoutingProviderCollection, UrlGenerator};
use tracing::info;

use crate::error::MiddleError;

type ValidationHandler =
    Box<dyn Fn(Request, ValidationFailed) -> Result<Response, Error> + Send + Sync>;

/// A fully wired request pipeline.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http::StatusCode;
/// use middle::Application;
/// use middle_core::{CallableController, Response, ResponseExt};
/// use middle_router::{RouteOptions, Router, RouterError};
///
/// let app = Application::builder()
///     .routes(|router: &mut Router| -> Result<(), RouterError> {
///         router.get(
///             "home",
///             "/",
///             || CallableController::from_fn(|_| Ok(Response::text(StatusCode::OK, "home"))),
///             RouteOptions::new(),
///         )
///     })
///     .build()
///     .unwrap();
///
/// let response = app.handle(http::Request::get("/").body(Bytes::new()).unwrap()).unwrap();
/// assert_eq!(response.body(), "home");
///
/// let response = app.handle(http::Request::get("/nope").body(Bytes::new()).unwrap()).unwrap();
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// ```
#[derive(Clone)]
pub struct Application {
    stack: ApplicationStack,
    router: Router,
}

impl Application {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// Runs a request through the pipeline.
    pub fn handle(&self, request: Request) -> Result<Response, Error> {
        self.stack.process(request)
    }

    /// Returns the assembled stack.
    pub fn stack(&self) -> &ApplicationStack {
        &self.stack
    }

    /// Returns the router, e.g. to add routes after assembly.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns a URL generator over the application's routes.
    pub fn url_generator(&self) -> UrlGenerator {
        self.router.generator()
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("stack", &self.stack)
            .field("routes", &self.router.len())
            .finish()
    }
}

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    config: MiddleConfig,
    routes: RoutingProviderCollection,
    fallback: Option<SharedController>,
    error_controller: Option<SharedController>,
    validation_handler: Option<ValidationHandler>,
    session: Option<SessionMiddleware>,
    logger: Option<Logger>,
}

impl ApplicationBuilder {
    /// Uses `config` instead of the defaults.
    pub fn config(mut self, config: MiddleConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a routing provider. Providers register in the order added.
    pub fn routes(mut self, provider: impl RoutingProvider + 'static) -> Self {
        self.routes = self.routes.with(provider);
        self
    }

    /// Sets the controller for requests no route matches.
    ///
    /// Defaults to a JSON `404 Not Found`.
    pub fn fallback(mut self, controller: impl Controller) -> Self {
        self.fallback = Some(Arc::new(controller));
        self
    }

    /// Sets the controller that renders errors caught by the error handler.
    ///
    /// Defaults to the JSON error envelope of the caught error.
    pub fn error_controller(mut self, controller: impl Controller) -> Self {
        self.error_controller = Some(Arc::new(controller));
        self
    }

    /// Sets the response for requests rejected by a controller's validator.
    ///
    /// Defaults to a JSON `400 Bad Request` listing the field errors.
    pub fn validation_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Request, ValidationFailed) -> Result<Response, Error> + Send + Sync + 'static,
    {
        self.validation_handler = Some(Box::new(handler));
        self
    }

    /// Adds the session stage backed by `processor`.
    pub fn session(mut self, processor: impl SessionProcessor + 'static) -> Self {
        self.session = Some(SessionMiddleware::new(processor));
        self
    }

    /// Routes pipeline diagnostics to `logger`.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validates the configuration, registers the routes and wires the stack.
    pub fn build(self) -> Result<Application, MiddleError> {
        self.config.validate()?;

        let mut router = Router::new(&self.config.router.base_url)?;
        router.register_routes(&self.routes)?;

        let validation = match self.validation_handler {
            Some(handler) => FilterValidationMiddleware::new(handler),
            None => FilterValidationMiddleware::new(default_validation_response),
        };
        let fallback = self
            .fallback
            .unwrap_or_else(|| CallableController::shared(not_found_controller));
        let error_controller = self
            .error_controller
            .unwrap_or_else(|| CallableController::shared(error_envelope_controller));

        let mut stack = ApplicationStack::new([SharedMiddleware::from(ControllerRunner::new())])
            .with_middleware(validation)
            .with_middleware(RoutingMiddleware::new(router.clone(), fallback));

        if let Some(session) = self.session {
            stack = stack.with_middleware(session);
        }
        if self.config.json.enabled {
            stack = stack.with_middleware(JsonRequestParserMiddleware::with_content_types(
                &self.config.json.content_types,
            )?);
        }

        let mut error_handler = ErrorHandlerMiddleware::new(error_controller)
            .catch_panics(self.config.error_handler.catch_panics);
        if let Some(logger) = &self.logger {
            error_handler = error_handler.with_logger(logger.clone());
            stack = stack.with_logger(logger.clone());
        }
        stack = stack.with_middleware(error_handler);

        info!(
            routes = router.len(),
            middleware = ?stack.middleware_names(),
            base_url = %self.config.router.base_url,
            "application assembled"
        );
        Ok(Application { stack, router })
    }
}

impl fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("config", &self.config)
            .field("providers", &self.routes.len())
            .field("session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

fn default_validation_response(
    _request: Request,
    failure: ValidationFailed,
) -> Result<Response, Error> {
    Ok(Response::from_error(&Error::ValidationFailed(failure)))
}

fn not_found_controller(_request: Request) -> Result<Response, Error> {
    Ok(Response::from_error(&Error::not_found(
        "no route matches the request",
    )))
}

fn error_envelope_controller(request: Request) -> Result<Response, Error> {
    Ok(match request.error() {
        Some(error) => Response::from_error(error),
        None => Response::from_error(&Error::msg("error controller invoked without an error")),
    })
}
