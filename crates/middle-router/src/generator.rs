//! Reverse routing: building paths and URLs from route names.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::error::RouterError;
use crate::route::CompiledRoute;
use crate::router::{BaseUrl, RouteTable};

/// Characters escaped in path segments and query components.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Catch-all variables may span several segments.
const CATCH_ALL: &AsciiSet = &COMPONENT.remove(b'/');

/// Generates paths and absolute URLs for named routes.
///
/// Obtained from [`Router::generator`](crate::Router::generator); it reads the
/// live route table, so routes registered later are available too.
#[derive(Clone)]
pub struct UrlGenerator {
    table: Arc<RwLock<RouteTable>>,
    base: Arc<BaseUrl>,
}

impl UrlGenerator {
    pub(crate) fn new(table: Arc<RwLock<RouteTable>>, base: Arc<BaseUrl>) -> Self {
        Self { table, base }
    }

    /// Builds the absolute path for `name`, including the mount prefix.
    ///
    /// Path variables are taken from `params`, then from the route defaults.
    /// Parameters that are not path variables are appended as a query string.
    pub fn generate_path(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<String, RouterError> {
        let table = self.table.read();
        let route = table
            .get(name)
            .ok_or_else(|| RouterError::UnknownRoute(name.to_string()))?;
        let mut path = self.base.path.clone();
        path.push_str(&expand(route, params)?);
        Ok(path)
    }

    /// Builds the absolute URL for `name`.
    ///
    /// The host is the route's host constraint when it has one, else the base
    /// URL's host. Without either, the path is returned.
    pub fn generate_url(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
        let path = self.generate_path(name, params)?;

        let table = self.table.read();
        let route_host = table
            .get(name)
            .and_then(|route| route.route.host().map(ToString::to_string));
        drop(table);

        let Some(host) = route_host.or_else(|| self.base.host.clone()) else {
            return Ok(path);
        };

        let mut url = format!("{}://{}", self.base.scheme, host);
        if let Some(port) = self.base.port {
            let _ = write!(url, ":{port}");
        }
        url.push_str(&path);
        Ok(url)
    }
}

impl std::fmt::Debug for UrlGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlGenerator")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// Substitutes the route's path variables and appends leftover parameters.
fn expand(route: &CompiledRoute, params: &[(&str, &str)]) -> Result<String, RouterError> {
    let name = route.route.name();
    let mut used = Vec::new();
    let mut path = String::new();
    let mut rest = route.route.path();

    while let Some(start) = rest.find('{') {
        path.push_str(&rest[..start].replace("}}", "}"));
        rest = &rest[start..];

        if let Some(after) = rest.strip_prefix("{{") {
            path.push('{');
            rest = after;
            continue;
        }

        let Some(end) = rest.find('}') else {
            break;
        };
        let variable = &rest[1..end];
        rest = &rest[end + 1..];

        let (variable, set) = match variable.strip_prefix('*') {
            Some(variable) => (variable, CATCH_ALL),
            None => (variable, COMPONENT),
        };

        let value = lookup(route, params, variable).ok_or_else(|| RouterError::MissingParameter {
            route: name.to_string(),
            param: variable.to_string(),
        })?;

        if let Some(regex) = route.requirements.get(variable) {
            if !regex.is_match(&value) {
                return Err(RouterError::InvalidParameter {
                    route: name.to_string(),
                    param: variable.to_string(),
                    requirement: route.route.requirements()[variable].clone(),
                    value,
                });
            }
        }

        path.extend(utf8_percent_encode(&value, set));
        used.push(variable);
    }
    path.push_str(&rest.replace("}}", "}"));

    let query: Vec<String> = params
        .iter()
        .filter(|(key, value)| {
            !used.contains(key)
                && route
                    .route
                    .defaults()
                    .get(*key)
                    .map_or(true, |default| default_to_string(default) != *value)
        })
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, COMPONENT),
                utf8_percent_encode(value, COMPONENT)
            )
        })
        .collect();

    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }
    Ok(path)
}

fn lookup(route: &CompiledRoute, params: &[(&str, &str)], variable: &str) -> Option<String> {
    params
        .iter()
        .find(|(key, _)| *key == variable)
        .map(|(_, value)| (*value).to_string())
        .or_else(|| route.route.defaults().get(variable).map(default_to_string))
}

fn default_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{RouteOptions, Router, RouterError};
    use bytes::Bytes;
    use middle_core::{CallableController, Response};

    fn router(base_url: &str) -> Router {
        let mut router = Router::new(base_url).unwrap();
        let factory = || CallableController::from_fn(|_| Ok(Response::new(Bytes::new())));
        router
            .get(
                "user",
                "/users/{id}",
                factory,
                RouteOptions::new().with_requirement("id", r"\d+"),
            )
            .unwrap();
        router
            .get(
                "list",
                "/users",
                factory,
                RouteOptions::new().with_default("page", "1"),
            )
            .unwrap();
        router
            .get("files", "/files/{*path}", factory, RouteOptions::new())
            .unwrap();
        router
            .get(
                "api",
                "/status",
                factory,
                RouteOptions::new().configure(|route| {
                    route.set_host("api.example.com");
                }),
            )
            .unwrap();
        router
    }

    #[test]
    fn test_generate_path() {
        let generator = router("http://localhost").generator();
        assert_eq!(generator.generate_path("user", &[("id", "42")]).unwrap(), "/users/42");
        assert_eq!(generator.generate_path("list", &[]).unwrap(), "/users");
    }

    #[test]
    fn test_generate_path_with_mount_prefix() {
        let generator = router("http://localhost/app/").generator();
        assert_eq!(
            generator.generate_path("user", &[("id", "42")]).unwrap(),
            "/app/users/42"
        );
    }

    #[test]
    fn test_extra_params_become_query() {
        let generator = router("http://localhost").generator();
        assert_eq!(
            generator
                .generate_path("user", &[("id", "1"), ("q", "a b&c")])
                .unwrap(),
            "/users/1?q=a%20b%26c"
        );
        assert_eq!(generator.generate_path("list", &[("page", "1")]).unwrap(), "/users");
        assert_eq!(
            generator.generate_path("list", &[("page", "2")]).unwrap(),
            "/users?page=2"
        );
    }

    #[test]
    fn test_catch_all_keeps_slashes() {
        let generator = router("http://localhost").generator();
        assert_eq!(
            generator
                .generate_path("files", &[("path", "docs/read me.txt")])
                .unwrap(),
            "/files/docs/read%20me.txt"
        );
    }

    #[test]
    fn test_generate_url() {
        let generator = router("https://example.com:8443/app").generator();
        assert_eq!(
            generator.generate_url("user", &[("id", "5")]).unwrap(),
            "https://example.com:8443/app/users/5"
        );
        assert_eq!(
            generator.generate_url("api", &[]).unwrap(),
            "https://api.example.com:8443/app/status"
        );
    }

    #[test]
    fn test_generate_errors() {
        let generator = router("http://localhost").generator();
        assert!(matches!(
            generator.generate_path("nope", &[]),
            Err(RouterError::UnknownRoute(_))
        ));
        assert!(matches!(
            generator.generate_path("user", &[]),
            Err(RouterError::MissingParameter { .. })
        ));
        assert!(matches!(
            generator.generate_path("user", &[("id", "abc")]),
            Err(RouterError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_generator_sees_later_routes() {
        let mut router = router("http://localhost");
        let generator = router.generator();
        router
            .post(
                "create",
                "/users/new",
                || CallableController::from_fn(|_| Ok(Response::new(Bytes::new()))),
                RouteOptions::new(),
            )
            .unwrap();
        assert_eq!(generator.generate_path("create", &[]).unwrap(), "/users/new");
    }
}
