//! The immutable middleware stack.
//!
//! An [`ApplicationStack`] owns an ordered sequence of middleware and is the
//! single entry point of the pipeline. Every mutator returns a new stack and
//! leaves the receiver untouched, so one stack can serve many requests (and
//! threads) at once.
//!
//! ## Ordering
//!
//! The stack is last-in, first-out. Constructor arguments are pushed in the
//! given order, so the first argument sits at the bottom and runs last;
//! each [`with_middleware`](ApplicationStack::with_middleware) call pushes a
//! new top that runs first.
//!
//! ```text
//! ApplicationStack::new([runner]).with_middleware(a).with_middleware(b)
//!
//! request  → b → a → runner
//! response ← b ← a ← runner
//! ```

use std::fmt;

use middle_core::{Error, Logger, Request, Response};

use crate::handler::{run, RequestHandler};
use crate::middleware::SharedMiddleware;

/// An immutable, copy-on-write middleware stack.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use middle_core::{CallableController, Request, RequestExt, Response, CONTROLLER_ATTRIBUTE};
/// use middle_pipeline::stages::ControllerRunner;
/// use middle_pipeline::{ApplicationStack, FnMiddleware, SharedMiddleware};
///
/// let controller =
///     CallableController::shared(|_| Ok(Response::new(Bytes::from_static(b"hello"))));
/// let stack = ApplicationStack::new([SharedMiddleware::from(ControllerRunner::new())])
///     .with_middleware(FnMiddleware::new("inject", move |request: Request, handler| {
///         handler.handle(request.with_attribute(CONTROLLER_ATTRIBUTE, controller.clone()))
///     }));
///
/// let response = stack.process(Request::new(Bytes::new())).unwrap();
/// assert_eq!(response.body(), "hello");
/// ```
#[derive(Clone, Default)]
pub struct ApplicationStack {
    stack: Vec<SharedMiddleware>,
    logger: Option<Logger>,
}

impl ApplicationStack {
    /// Creates a stack; the first middleware ends up at the bottom.
    pub fn new(middlewares: impl IntoIterator<Item = SharedMiddleware>) -> Self {
        Self {
            stack: middlewares.into_iter().collect(),
            logger: None,
        }
    }

    /// Returns a new stack with `middleware` on top.
    #[must_use]
    pub fn with_middleware(&self, middleware: impl Into<SharedMiddleware>) -> Self {
        let mut stack = self.clone();
        stack.stack.push(middleware.into());
        stack
    }

    /// Returns a new stack without the first (bottom-most) occurrence of `middleware`.
    ///
    /// Middleware are compared by identity. The stack is returned unchanged
    /// when `middleware` is not part of it.
    #[must_use]
    pub fn without_middleware(&self, middleware: &SharedMiddleware) -> Self {
        let mut stack = self.clone();
        if let Some(index) = stack.stack.iter().position(|m| m == middleware) {
            stack.stack.remove(index);
        }
        stack
    }

    /// Returns a new stack that logs the start and finish of every middleware.
    #[must_use]
    pub fn with_logger(&self, logger: Logger) -> Self {
        let mut stack = self.clone();
        stack.logger = Some(logger);
        stack
    }

    /// Returns the number of middleware.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if the stack holds no middleware.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns the middleware names in execution order (top first).
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.stack.iter().rev().map(SharedMiddleware::name).collect()
    }

    /// Runs a request through the stack.
    ///
    /// Fails with [`Error::EmptyStack`] when the stack holds no middleware.
    pub fn process(&self, request: Request) -> Result<Response, Error> {
        let mut stack = self.stack.clone();
        let Some(top) = stack.pop() else {
            return Err(Error::EmptyStack);
        };

        let mut handler = RequestHandler::new(stack).with_optional_logger(self.logger.clone());
        run(&top, request, &mut handler, self.logger.as_ref())
    }
}

impl fmt::Debug for ApplicationStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationStack")
            .field("middleware", &self.middleware_names())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{FnMiddleware, Middleware};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A middleware that records when it runs, before and after delegating.
    struct OrderTrackingMiddleware {
        name: &'static str,
        order: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for OrderTrackingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process(
            &self,
            request: Request,
            handler: &mut RequestHandler,
        ) -> Result<Response, Error> {
            self.order.lock().push(format!("before-{}", self.name));
            let response = handler.handle(request);
            self.order.lock().push(format!("after-{}", self.name));
            response
        }
    }

    fn tracker(name: &'static str, order: &Arc<Mutex<Vec<String>>>) -> SharedMiddleware {
        OrderTrackingMiddleware {
            name,
            order: Arc::clone(order),
        }
        .into()
    }

    fn terminal(order: &Arc<Mutex<Vec<String>>>) -> SharedMiddleware {
        let order = Arc::clone(order);
        FnMiddleware::new("terminal", move |_request, _handler| {
            order.lock().push("execute".to_string());
            Ok(Response::new(Bytes::from_static(b"done")))
        })
        .into()
    }

    #[test]
    fn test_empty_stack() {
        let err = ApplicationStack::default()
            .process(Request::new(Bytes::new()))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyStack));
    }

    #[test]
    fn test_removing_only_middleware_empties_stack() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let only = terminal(&order);
        let stack = ApplicationStack::new([only.clone()]).without_middleware(&only);

        assert!(stack.is_empty());
        let err = stack.process(Request::new(Bytes::new())).unwrap_err();
        assert!(matches!(err, Error::EmptyStack));
    }

    #[test]
    fn test_lifo_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let stack = ApplicationStack::new([terminal(&order)])
            .with_middleware(tracker("1", &order))
            .with_middleware(tracker("2", &order));

        let response = stack.process(Request::new(Bytes::new())).unwrap();
        assert_eq!(response.body(), "done");
        assert_eq!(
            *order.lock(),
            vec!["before-2", "before-1", "execute", "after-1", "after-2"]
        );
    }

    #[test]
    fn test_constructor_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let stack = ApplicationStack::new([
            terminal(&order),
            tracker("a", &order),
            tracker("b", &order),
        ]);
        assert_eq!(stack.middleware_names(), vec!["b", "a", "terminal"]);

        stack.process(Request::new(Bytes::new())).unwrap();
        assert_eq!(
            *order.lock(),
            vec!["before-b", "before-a", "execute", "after-a", "after-b"]
        );
    }

    #[test]
    fn test_with_middleware_leaves_original_untouched() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let original = ApplicationStack::new([terminal(&order)]);
        let extended = original.with_middleware(tracker("x", &order));

        assert_eq!(original.len(), 1);
        assert_eq!(extended.len(), 2);

        original.process(Request::new(Bytes::new())).unwrap();
        assert_eq!(*order.lock(), vec!["execute"]);
    }

    #[test]
    fn test_without_middleware_removes_first_occurrence() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let base = terminal(&order);
        let repeated = tracker("r", &order);
        let other = tracker("o", &order);

        let stack = ApplicationStack::new([
            base.clone(),
            repeated.clone(),
            other.clone(),
            repeated.clone(),
        ]);
        let removed = stack.without_middleware(&repeated);

        assert_eq!(stack.len(), 4);
        assert_eq!(removed.middleware_names(), vec!["r", "o", "terminal"]);

        let unrelated = tracker("r", &order);
        assert_eq!(stack.without_middleware(&unrelated).len(), 4);
    }

    #[test]
    fn test_stack_is_reusable() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let stack = ApplicationStack::new([terminal(&order)]).with_middleware(tracker("1", &order));

        stack.process(Request::new(Bytes::new())).unwrap();
        stack.process(Request::new(Bytes::new())).unwrap();
        assert_eq!(order.lock().len(), 6);
    }

    #[test]
    fn test_errors_propagate() {
        let stack = ApplicationStack::new([SharedMiddleware::from(FnMiddleware::new(
            "failing",
            |_request, _handler| Err(Error::not_found("nothing here")),
        ))]);

        let err = stack.process(Request::new(Bytes::new())).unwrap_err();
        assert_eq!(err.to_string(), "not found: nothing here");
    }
}
