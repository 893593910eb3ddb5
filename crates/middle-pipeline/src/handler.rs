//! The single-use continuation that advances the middleware chain.

use std::fmt;

use middle_core::{Error, Logger, Request, Response};
use tracing::debug;

use crate::middleware::SharedMiddleware;

/// Runs the next middleware of a stack snapshot.
///
/// Each handler may be invoked once. Invoking it pops the top middleware and
/// passes it a fresh handler over the remaining stack, so every step of the
/// chain owns its own run-once guard.
///
/// The stack is ordered bottom to top: the last element runs first.
pub struct RequestHandler {
    stack: Vec<SharedMiddleware>,
    called: bool,
    logger: Option<Logger>,
}

impl RequestHandler {
    /// Creates a handler over a stack snapshot.
    pub fn new(stack: Vec<SharedMiddleware>) -> Self {
        Self {
            stack,
            called: false,
            logger: None,
        }
    }

    /// Emits start and finish events for every middleware through `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub(crate) fn with_optional_logger(mut self, logger: Option<Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Returns true once [`handle`](Self::handle) has run.
    pub fn is_called(&self) -> bool {
        self.called
    }

    /// Returns the number of middleware left below this handler.
    pub fn remaining(&self) -> usize {
        self.stack.len()
    }

    /// Runs the top middleware with a handler over the rest of the stack.
    ///
    /// Fails with [`Error::EmptyStack`] when nothing is left to run and with
    /// [`Error::AlreadyCalled`] on every call after the first.
    pub fn handle(&mut self, request: Request) -> Result<Response, Error> {
        if self.called {
            return Err(Error::AlreadyCalled);
        }
        let mut stack = std::mem::take(&mut self.stack);
        let Some(middleware) = stack.pop() else {
            return Err(Error::EmptyStack);
        };
        self.called = true;

        let mut next = Self::new(stack).with_optional_logger(self.logger.clone());
        run(&middleware, request, &mut next, self.logger.as_ref())
    }
}

/// Invokes one middleware, wrapped in start and finish events when a logger is set.
pub(crate) fn run(
    middleware: &SharedMiddleware,
    request: Request,
    next: &mut RequestHandler,
    logger: Option<&Logger>,
) -> Result<Response, Error> {
    let name = middleware.name();
    if let Some(logger) = logger {
        logger.in_scope(|| debug!(middleware = name, "middleware started"));
    }

    let result = middleware.process(request, next);

    if let Some(logger) = logger {
        let success = result.is_ok();
        logger.in_scope(|| debug!(middleware = name, success, "middleware finished"));
    }
    result
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("stack", &self.stack)
            .field("called", &self.called)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use bytes::Bytes;

    fn terminal(body: &'static str) -> SharedMiddleware {
        FnMiddleware::new("terminal", move |_request, _handler| {
            Ok(Response::new(Bytes::from_static(body.as_bytes())))
        })
        .into()
    }

    #[test]
    fn test_empty_stack() {
        let mut handler = RequestHandler::new(Vec::new());
        let err = handler.handle(Request::new(Bytes::new())).unwrap_err();
        assert!(matches!(err, Error::EmptyStack));
        assert!(!handler.is_called());
    }

    #[test]
    fn test_handle_runs_top_middleware() {
        let mut handler = RequestHandler::new(vec![terminal("bottom"), terminal("top")]);
        let response = handler.handle(Request::new(Bytes::new())).unwrap();
        assert_eq!(response.body(), "top");
        assert!(handler.is_called());
    }

    #[test]
    fn test_second_call_fails() {
        let mut handler = RequestHandler::new(vec![terminal("only")]);
        handler.handle(Request::new(Bytes::new())).unwrap();

        for _ in 0..3 {
            let err = handler.handle(Request::new(Bytes::new())).unwrap_err();
            assert!(matches!(err, Error::AlreadyCalled));
        }
    }

    #[test]
    fn test_next_handler_sees_remaining_stack() {
        let inspect: SharedMiddleware = FnMiddleware::new("inspect", |request, handler| {
            assert_eq!(handler.remaining(), 1);
            handler.handle(request)
        })
        .into();

        let mut handler = RequestHandler::new(vec![terminal("bottom"), inspect]);
        let response = handler.handle(Request::new(Bytes::new())).unwrap();
        assert_eq!(response.body(), "bottom");
    }

    #[test]
    fn test_middleware_cannot_replay_chain() {
        let replay: SharedMiddleware = FnMiddleware::new("replay", |request: Request, handler| {
            handler.handle(request.clone())?;
            handler.handle(request)
        })
        .into();

        let mut handler = RequestHandler::new(vec![terminal("bottom"), replay]);
        let err = handler.handle(Request::new(Bytes::new())).unwrap_err();
        assert!(matches!(err, Error::AlreadyCalled));
    }
}
