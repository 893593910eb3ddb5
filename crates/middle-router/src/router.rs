//! The route table and request resolution.

use std::collections::HashMap;
use std::sync::Arc;

use http::header::HOST;
use http::Uri;
use indexmap::IndexMap;
use middle_core::{ControllerFactory, Error, Request};
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::RouterError;
use crate::generator::UrlGenerator;
use crate::provider::RoutingProvider;
use crate::route::{CompiledRoute, Route, RouteOptions};
use crate::route_match::RouteMatch;

/// Attribute keys that never leak from a match into the request attributes.
const RESERVED_ATTRIBUTES: [&str; 2] = ["controller", "_route"];

/// Resolves requests to route matches.
///
/// This is the seam the routing middleware depends on, so alternative
/// matchers can be plugged in.
pub trait RouteResolver: Send + Sync {
    /// Resolves the request.
    ///
    /// A non-match is `Ok(RouteMatch::NotMatched)`. Errors are reserved for
    /// genuine failures of the matching engine.
    fn parse_request(&self, request: &Request) -> Result<RouteMatch, Error>;
}

/// Registered routes in registration order.
///
/// Every distinct path pattern gets its own matcher, so patterns that
/// overlap (`/users/new` and `/users/{id}`, or `/users/{id}` and
/// `/users/{slug}`) can coexist and are resolved in registration order.
#[derive(Default)]
pub(crate) struct RouteTable {
    matchers: Vec<matchit::Router<()>>,
    slots: HashMap<String, usize>,
    pub(crate) routes: Vec<(usize, CompiledRoute)>,
    pub(crate) names: HashMap<String, usize>,
}

impl RouteTable {
    fn insert(&mut self, route: CompiledRoute) -> Result<(), RouterError> {
        let name = route.route.name().to_string();
        if self.names.contains_key(&name) {
            return Err(RouterError::DuplicateName(name));
        }

        let pattern = route.route.path().to_string();
        let slot = if let Some(&slot) = self.slots.get(&pattern) {
            slot
        } else {
            let mut matcher = matchit::Router::new();
            matcher
                .insert(pattern.clone(), ())
                .map_err(|source| RouterError::InvalidPath {
                    route: name.clone(),
                    source,
                })?;
            let slot = self.matchers.len();
            self.matchers.push(matcher);
            self.slots.insert(pattern, slot);
            slot
        };

        self.names.insert(name, self.routes.len());
        self.routes.push((slot, route));
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CompiledRoute> {
        self.names.get(name).map(|&index| &self.routes[index].1)
    }

    /// Matches `path` against one pattern and decodes its variables.
    ///
    /// Variables that are not valid percent-encoded UTF-8 make the pattern
    /// a non-match.
    fn variables(&self, slot: usize, path: &str) -> Option<IndexMap<String, String>> {
        let matched = self.matchers[slot].at(path).ok()?;
        let mut variables = IndexMap::new();
        for (key, value) in matched.params.iter() {
            let Ok(decoded) = percent_decode_str(value).decode_utf8() else {
                trace!(param = key, path, "path variable is not valid UTF-8");
                return None;
            };
            variables.insert(key.to_string(), decoded.into_owned());
        }
        Some(variables)
    }
}

/// The URL the application is served from.
///
/// Its path is the mount prefix stripped from incoming paths and prepended to
/// generated ones; scheme and authority are used for absolute URLs.
#[derive(Debug, Clone)]
pub(crate) struct BaseUrl {
    pub(crate) scheme: String,
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) path: String,
}

impl BaseUrl {
    fn parse(url: &str) -> Result<Self, RouterError> {
        let uri: Uri = url.parse().map_err(|err: http::uri::InvalidUri| {
            RouterError::InvalidBaseUrl {
                url: url.to_string(),
                reason: err.to_string(),
            }
        })?;

        Ok(Self {
            scheme: uri.scheme_str().unwrap_or("http").to_string(),
            host: uri.host().map(ToString::to_string),
            port: uri.port_u16(),
            path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    /// Strips the mount prefix. Paths outside the prefix pass through unchanged.
    fn relativize<'a>(&self, path: &'a str) -> &'a str {
        if self.path.is_empty() {
            return path;
        }
        match path.strip_prefix(self.path.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }
}

/// Maps requests to controllers and generates URLs for named routes.
///
/// Clones share the same route table, so routes registered through one clone
/// are visible to every clone and to every [`UrlGenerator`] obtained from them.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use middle_core::{CallableController, Request, Response};
/// use middle_router::{RouteOptions, Router};
///
/// let mut router = Router::new("http://localhost/api").unwrap();
/// router
///     .get(
///         "user",
///         "/users/{id}",
///         || CallableController::from_fn(|_| Ok(Response::new(Bytes::new()))),
///         RouteOptions::new().with_requirement("id", r"\d+"),
///     )
///     .unwrap();
///
/// let request = http::Request::get("/api/users/123").body(Bytes::new()).unwrap();
/// let route_match = router.parse_request(&request).unwrap();
/// assert_eq!(route_match.name(), "user");
/// assert_eq!(route_match.attributes().unwrap()["id"], "123");
///
/// let path = router.generator().generate_path("user", &[("id", "7")]).unwrap();
/// assert_eq!(path, "/api/users/7");
/// ```
#[derive(Clone)]
pub struct Router {
    table: Arc<RwLock<RouteTable>>,
    base: Arc<BaseUrl>,
}

impl Router {
    /// Creates a router serving from `base_url`.
    pub fn new(base_url: &str) -> Result<Self, RouterError> {
        Ok(Self {
            table: Arc::new(RwLock::new(RouteTable::default())),
            base: Arc::new(BaseUrl::parse(base_url)?),
        })
    }

    /// Registers a route for a pipe-delimited method set such as `GET|HEAD`.
    pub fn match_route(
        &mut self,
        name: impl Into<String>,
        methods: &str,
        path: impl Into<String>,
        factory: impl ControllerFactory,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        let mut route = Route::new(name.into(), methods, path.into(), Arc::new(factory));
        route.merge_options(options);
        let compiled = CompiledRoute::compile(route)?;

        debug!(
            route = compiled.route.name(),
            path = compiled.route.path(),
            methods = ?compiled.route.methods(),
            "route registered"
        );
        self.table.write().insert(compiled)
    }

    /// Registers a `GET` route.
    pub fn get(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        factory: impl ControllerFactory,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        self.match_route(name, "GET", path, factory, options)
    }

    /// Registers a `POST` route.
    pub fn post(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        factory: impl ControllerFactory,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        self.match_route(name, "POST", path, factory, options)
    }

    /// Registers a `PUT` route.
    pub fn put(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        factory: impl ControllerFactory,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        self.match_route(name, "PUT", path, factory, options)
    }

    /// Registers a `PATCH` route.
    pub fn patch(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        factory: impl ControllerFactory,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        self.match_route(name, "PATCH", path, factory, options)
    }

    /// Registers a `DELETE` route.
    pub fn delete(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        factory: impl ControllerFactory,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        self.match_route(name, "DELETE", path, factory, options)
    }

    /// Registers a `HEAD` route.
    pub fn head(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        factory: impl ControllerFactory,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        self.match_route(name, "HEAD", path, factory, options)
    }

    /// Lets a provider register its routes on this router.
    pub fn register_routes(&mut self, provider: &dyn RoutingProvider) -> Result<(), RouterError> {
        provider.register_routes(self)
    }

    /// Returns a URL generator bound to this router's route table.
    pub fn generator(&self) -> UrlGenerator {
        UrlGenerator::new(Arc::clone(&self.table), Arc::clone(&self.base))
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.table.read().routes.len()
    }

    /// Returns true if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a request against the route table.
    ///
    /// Routes are tried in registration order; the first whose method set,
    /// host, path pattern and requirements all accept the request wins.
    pub fn parse_request(&self, request: &Request) -> Result<RouteMatch, Error> {
        let path = self.base.relativize(request.uri().path());
        let method = request.method().as_str();
        let host = request_host(request);

        let table = self.table.read();
        let mut matched_slots: HashMap<usize, Option<IndexMap<String, String>>> = HashMap::new();
        let mut found = None;
        for (slot, compiled) in &table.routes {
            if !compiled.route.accepts_method(method)
                || !compiled.route.accepts_host(host.as_deref())
            {
                continue;
            }
            let variables = matched_slots
                .entry(*slot)
                .or_insert_with(|| table.variables(*slot, path));
            if let Some(variables) = variables {
                if compiled.satisfies_requirements(variables) {
                    found = Some((compiled, variables.clone()));
                    break;
                }
            }
        }

        let Some((route, variables)) = found else {
            trace!(path, method, "no route accepts request");
            return Ok(RouteMatch::NotMatched);
        };

        let name = route.route.name().to_string();
        let factory = Arc::clone(route.route.factory());
        let mut attributes = route.route.defaults().clone();
        drop(table);

        for (key, value) in variables {
            attributes.insert(key, Value::String(value));
        }
        for reserved in RESERVED_ATTRIBUTES {
            attributes.shift_remove(reserved);
        }

        debug!(route = %name, path, method, "route matched");
        Ok(RouteMatch::matched(name, factory.create(), attributes))
    }
}

impl RouteResolver for Router {
    fn parse_request(&self, request: &Request) -> Result<RouteMatch, Error> {
        Router::parse_request(self, request)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base", &self.base)
            .field("routes", &self.len())
            .finish()
    }
}

/// Host of the request from the URI authority, else the `Host` header, without port.
fn request_host(request: &Request) -> Option<String> {
    if let Some(host) = request.uri().host() {
        return Some(host.to_string());
    }
    let header = request.headers().get(HOST)?.to_str().ok()?;
    let host = if header.starts_with('[') {
        header.find(']').map_or(header, |end| &header[..=end])
    } else {
        header.split(':').next().unwrap_or(header)
    };
    Some(host.to_string())
}
