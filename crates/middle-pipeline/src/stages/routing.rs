//! Routing stage: turns a route match into request attributes.

use std::fmt;
use std::sync::Arc;

use middle_core::{
    Controller, Error, Request, RequestExt, Response, SharedController, CONTROLLER_ATTRIBUTE,
};
use middle_router::{RouteMatch, RouteResolver};
use tracing::debug;

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Resolves the request and stores the controller and route attributes on it.
///
/// On a non-match the configured fallback controller is stored instead. The
/// request is always passed on; this stage never answers by itself. Genuine
/// routing failures propagate.
pub struct RoutingMiddleware {
    router: Arc<dyn RouteResolver>,
    fallback: SharedController,
}

impl RoutingMiddleware {
    /// Creates the stage from a resolver and a fallback controller.
    pub fn new(router: impl RouteResolver + 'static, fallback: impl Controller) -> Self {
        Self {
            router: Arc::new(router),
            fallback: Arc::new(fallback),
        }
    }
}

impl Middleware for RoutingMiddleware {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        let request = match self.router.parse_request(&request)? {
            RouteMatch::Matched {
                name,
                controller,
                attributes,
            } => {
                debug!(route = %name, path = request.uri().path(), "routed request");
                attributes.into_iter().fold(
                    request.with_attribute(CONTROLLER_ATTRIBUTE, controller),
                    |request, (key, value)| request.with_attribute(key, value),
                )
            }
            RouteMatch::NotMatched => {
                debug!(path = request.uri().path(), "no route matched, using fallback controller");
                request.with_attribute(CONTROLLER_ATTRIBUTE, Arc::clone(&self.fallback))
            }
        };

        handler.handle(request)
    }
}

impl fmt::Debug for RoutingMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingMiddleware").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{FnMiddleware, SharedMiddleware};
    use bytes::Bytes;
    use indexmap::IndexMap;
    use middle_core::CallableController;
    use serde_json::{json, Value};

    struct FixedResolver(RouteMatch);

    impl RouteResolver for FixedResolver {
        fn parse_request(&self, _request: &Request) -> Result<RouteMatch, Error> {
            Ok(self.0.clone())
        }
    }

    struct FailingResolver;

    impl RouteResolver for FailingResolver {
        fn parse_request(&self, _request: &Request) -> Result<RouteMatch, Error> {
            Err(Error::msg("matcher exploded"))
        }
    }

    fn text(
        body: &'static str,
    ) -> CallableController<impl Fn(Request) -> Result<Response, Error> + Send + Sync + 'static>
    {
        CallableController::from_fn(move |_| {
            Ok(Response::new(Bytes::from_static(body.as_bytes())))
        })
    }

    /// Runs the routed controller and echoes the `id` attribute next to its body.
    fn inspector() -> SharedMiddleware {
        FnMiddleware::new("inspector", |request: Request, _handler| {
            let controller = request.controller()?;
            let body = controller.execute(request.clone())?;
            let id = request.param("id").unwrap_or("-").to_string();
            Ok(Response::new(Bytes::from(format!(
                "{}:{id}",
                String::from_utf8_lossy(body.body())
            ))))
        })
        .into()
    }

    #[test]
    fn test_match_sets_controller_and_attributes() {
        let mut attributes = IndexMap::new();
        attributes.insert("id".to_string(), json!("123"));
        let route_match = RouteMatch::matched("user", Arc::new(text("user")), attributes);
        let routing = RoutingMiddleware::new(FixedResolver(route_match), text("fallback"));

        let mut handler = RequestHandler::new(vec![inspector()]);
        let response = routing.process(Request::new(Bytes::new()), &mut handler).unwrap();
        assert_eq!(response.body(), "user:123");
        assert!(handler.is_called());
    }

    #[test]
    fn test_non_match_uses_fallback_and_continues() {
        let routing =
            RoutingMiddleware::new(FixedResolver(RouteMatch::NotMatched), text("fallback"));

        let mut handler = RequestHandler::new(vec![inspector()]);
        let response = routing.process(Request::new(Bytes::new()), &mut handler).unwrap();
        assert_eq!(response.body(), "fallback:-");
        assert!(handler.is_called());
    }

    #[test]
    fn test_non_string_attributes_are_kept() {
        let mut attributes = IndexMap::new();
        attributes.insert("page".to_string(), json!(2));
        let route_match = RouteMatch::matched("list", Arc::new(text("list")), attributes);
        let routing = RoutingMiddleware::new(FixedResolver(route_match), text("fallback"));

        let check: SharedMiddleware = FnMiddleware::new("check", |request: Request, _handler| {
            let page = request.attribute("page").and_then(|a| a.as_value()).cloned();
            assert_eq!(page, Some(Value::from(2)));
            Ok(Response::new(Bytes::new()))
        })
        .into();

        let mut handler = RequestHandler::new(vec![check]);
        routing.process(Request::new(Bytes::new()), &mut handler).unwrap();
    }

    #[test]
    fn test_resolver_errors_propagate() {
        let routing = RoutingMiddleware::new(FailingResolver, text("fallback"));
        let mut handler = RequestHandler::new(vec![inspector()]);
        let err = routing.process(Request::new(Bytes::new()), &mut handler).unwrap_err();
        assert_eq!(err.to_string(), "matcher exploded");
        assert!(!handler.is_called());
    }
}
