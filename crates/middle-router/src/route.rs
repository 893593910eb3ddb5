//! Route definitions.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use middle_core::ControllerFactory;
use regex::Regex;
use serde_json::Value;

use crate::error::RouterError;

/// Callback that adjusts a route before it is added to the route table.
pub type RouteConfigurator = Box<dyn FnOnce(&mut Route)>;

/// Optional arguments of route registration.
///
/// # Example
///
/// ```
/// use middle_router::RouteOptions;
///
/// let options = RouteOptions::new()
///     .with_default("page", "1")
///     .with_requirement("id", r"\d+")
///     .configure(|route| {
///         route.set_host("api.example.com");
///     });
/// ```
#[derive(Default)]
pub struct RouteOptions {
    pub(crate) defaults: IndexMap<String, Value>,
    pub(crate) requirements: IndexMap<String, String>,
    pub(crate) configure: Option<RouteConfigurator>,
}

impl RouteOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default attribute value.
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Adds a regex requirement for a path variable.
    pub fn with_requirement(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.requirements.insert(name.into(), pattern.into());
        self
    }

    /// Sets a callback invoked with the route before it is compiled.
    pub fn configure(mut self, configure: impl FnOnce(&mut Route) + 'static) -> Self {
        self.configure = Some(Box::new(configure));
        self
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("defaults", &self.defaults)
            .field("requirements", &self.requirements)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

/// A named route: method set, path pattern, controller factory and constraints.
///
/// Path patterns use `{name}` placeholders for single segments and
/// `{*name}` for a trailing catch-all.
pub struct Route {
    name: String,
    path: String,
    methods: Vec<String>,
    defaults: IndexMap<String, Value>,
    requirements: IndexMap<String, String>,
    host: Option<String>,
    factory: Arc<dyn ControllerFactory>,
}

impl Route {
    pub(crate) fn new(
        name: String,
        methods: &str,
        path: String,
        factory: Arc<dyn ControllerFactory>,
    ) -> Self {
        Self {
            name,
            path,
            methods: parse_methods(methods),
            defaults: IndexMap::new(),
            requirements: IndexMap::new(),
            host: None,
            factory,
        }
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the path pattern.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the accepted methods. Empty means any method.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// Replaces the accepted methods with a pipe-delimited set such as `GET|HEAD`.
    pub fn set_methods(&mut self, methods: &str) -> &mut Self {
        self.methods = parse_methods(methods);
        self
    }

    /// Returns the host constraint.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Restricts the route to requests for `host` (compared case-insensitively).
    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    /// Returns the default attribute values.
    pub fn defaults(&self) -> &IndexMap<String, Value> {
        &self.defaults
    }

    /// Sets a default attribute value.
    pub fn set_default(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Returns the raw requirement patterns.
    pub fn requirements(&self) -> &IndexMap<String, String> {
        &self.requirements
    }

    /// Sets a regex requirement for a path variable.
    pub fn set_requirement(
        &mut self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        self.requirements.insert(name.into(), pattern.into());
        self
    }

    pub(crate) fn accepts_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == method)
    }

    pub(crate) fn accepts_host(&self, host: Option<&str>) -> bool {
        match (&self.host, host) {
            (None, _) => true,
            (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        }
    }

    pub(crate) fn factory(&self) -> &Arc<dyn ControllerFactory> {
        &self.factory
    }

    pub(crate) fn merge_options(&mut self, options: RouteOptions) {
        self.defaults.extend(options.defaults);
        self.requirements.extend(options.requirements);
        if let Some(configure) = options.configure {
            configure(self);
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("defaults", &self.defaults)
            .field("requirements", &self.requirements)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

fn parse_methods(methods: &str) -> Vec<String> {
    methods
        .split('|')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// A route with its requirements compiled to anchored regexes.
#[derive(Debug)]
pub(crate) struct CompiledRoute {
    pub(crate) route: Route,
    pub(crate) requirements: IndexMap<String, Regex>,
}

impl CompiledRoute {
    pub(crate) fn compile(route: Route) -> Result<Self, RouterError> {
        let requirements = route
            .requirements
            .iter()
            .map(|(param, pattern)| {
                Regex::new(&format!("^(?:{pattern})$"))
                    .map(|regex| (param.clone(), regex))
                    .map_err(|source| RouterError::InvalidRequirement {
                        route: route.name.clone(),
                        param: param.clone(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            route,
            requirements,
        })
    }

    /// Returns true when every requirement naming a known variable passes.
    pub(crate) fn satisfies_requirements(&self, params: &IndexMap<String, String>) -> bool {
        self.requirements.iter().all(|(param, regex)| {
            params
                .get(param)
                .map_or(true, |value| regex.is_match(value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use middle_core::{CallableController, Response};

    fn route(methods: &str) -> Route {
        let factory: Arc<dyn ControllerFactory> = Arc::new(|| {
            CallableController::from_fn(|_| Ok(Response::new(Bytes::new())))
        });
        Route::new("test".to_string(), methods, "/users/{id}".to_string(), factory)
    }

    #[test]
    fn test_method_set_is_literal() {
        let route = route("GET|HEAD");
        assert_eq!(route.methods(), ["GET", "HEAD"]);
        assert!(route.accepts_method("GET"));
        assert!(route.accepts_method("HEAD"));
        assert!(!route.accepts_method("get"));
        assert!(!route.accepts_method("POST"));
    }

    #[test]
    fn test_empty_method_set_accepts_any() {
        let route = route("");
        assert!(route.accepts_method("DELETE"));
    }

    #[test]
    fn test_host_is_case_insensitive() {
        let mut route = route("GET");
        assert!(route.accepts_host(None));
        route.set_host("Example.COM");
        assert!(route.accepts_host(Some("example.com")));
        assert!(!route.accepts_host(Some("other.com")));
        assert!(!route.accepts_host(None));
    }

    #[test]
    fn test_options_merge_and_configure() {
        let mut route = route("GET");
        route.merge_options(
            RouteOptions::new()
                .with_default("page", "1")
                .with_requirement("id", r"\d+")
                .configure(|route| {
                    route.set_methods("GET|POST").set_requirement("id", "[a-z]+");
                }),
        );
        assert_eq!(route.defaults()["page"], "1");
        assert_eq!(route.requirements()["id"], "[a-z]+");
        assert_eq!(route.methods(), ["GET", "POST"]);
    }

    #[test]
    fn test_requirements_are_anchored() {
        let mut route = route("GET");
        route.set_requirement("id", r"\d+").set_requirement("unknown", "x");
        let compiled = CompiledRoute::compile(route).unwrap();

        let mut params = IndexMap::new();
        params.insert("id".to_string(), "123".to_string());
        assert!(compiled.satisfies_requirements(&params));

        params.insert("id".to_string(), "123abc".to_string());
        assert!(!compiled.satisfies_requirements(&params));
    }

    #[test]
    fn test_invalid_requirement() {
        let mut route = route("GET");
        route.set_requirement("id", "(");
        let err = CompiledRoute::compile(route).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRequirement { .. }));
    }
}
